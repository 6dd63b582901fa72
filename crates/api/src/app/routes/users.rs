//! User administration. Every endpoint here is admin-only, and the policy
//! runs before the target user is looked up.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use taskboard_auth::{UserPatchInput, policy};
use taskboard_core::UserId;
use taskboard_infra::StoreError;

use crate::app::dto::{MessageResponse, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::enforce;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&ctx, "users.list", policy::can_list_users(ctx.principal()))?;

    let users = services.store.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect::<Vec<_>>()))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&ctx, "users.view", policy::can_view_user(ctx.principal()))?;

    let id: UserId = id.parse()?;
    let user = services.store.get_user(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(UserResponse::from(&user)))
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<UserPatchInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&ctx, "users.update", policy::can_update_user(ctx.principal()))?;

    let id: UserId = id.parse()?;
    let mut user = services.store.get_user(id).await?.ok_or(ApiError::NotFound)?;

    let Json(body) = body?;
    let patch = body.validate()?;

    if let Some(role) = patch.role {
        enforce(&ctx, "users.change_role", policy::can_change_user_role(ctx.principal()))?;
        tracing::info!(
            actor_id = %ctx.principal().id,
            user_id = %user.id,
            role = %role,
            "changing user role"
        );
    }

    if let Some(email) = patch.email.as_deref().filter(|e| *e != user.email) {
        if services.store.find_user_by_email(email).await?.is_some() {
            return Err(ApiError::validation("email", "the email has already been taken"));
        }
    }

    user.apply(patch, Utc::now());
    let user = match services.store.update_user(&user).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => {
            return Err(ApiError::validation("email", "the email has already been taken"));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Json(UserResponse::from(&user)))
}

/// Deletes the account and, with it, every task it owns.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&ctx, "users.delete", policy::can_attempt_user_deletion(ctx.principal()))?;

    let id: UserId = id.parse()?;
    enforce(&ctx, "users.delete", policy::can_delete_user(ctx.principal(), id))?;

    if !services.store.delete_user(id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(actor_id = %ctx.principal().id, user_id = %id, "user deleted");

    Ok(Json(MessageResponse {
        message: "user deleted",
    }))
}
