use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use taskboard_auth::{Registration, UserAccount, user::normalize_email};
use taskboard_core::FieldErrors;
use taskboard_infra::StoreError;

use crate::app::dto::{AuthResponse, LoginRequest, MessageResponse, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

const EMAIL_TAKEN: &str = "the email has already been taken";
const BAD_CREDENTIALS: &str = "these credentials do not match our records";

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let now = Utc::now();

    let new_user = body.validate(now)?;
    if services.store.find_user_by_email(&new_user.email).await?.is_some() {
        return Err(ApiError::validation("email", EMAIL_TAKEN));
    }

    let account = match services.store.insert_user(new_user).await {
        Ok(account) => account,
        // lost a race with a concurrent registration
        Err(StoreError::Conflict(_)) => return Err(ApiError::validation("email", EMAIL_TAKEN)),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %account.id, "user registered");

    Ok((StatusCode::CREATED, Json(issue_session(&services, &account)?)))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;

    let mut errors = FieldErrors::new();
    let email = body.email.map(|e| normalize_email(&e)).filter(|e| !e.is_empty());
    if email.is_none() {
        errors.add("email", "the email field is required");
    }
    let password = body.password.filter(|p| !p.is_empty());
    if password.is_none() {
        errors.add("password", "the password field is required");
    }
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::Validation(errors));
    };

    let account = services
        .store
        .find_user_by_email(&email)
        .await?
        .filter(|account| account.check_password(&password))
        .ok_or_else(|| ApiError::validation("email", BAD_CREDENTIALS))?;

    tracing::info!(user_id = %account.id, "user logged in");
    Ok(Json(issue_session(&services, &account)?))
}

/// Revokes only the token used for this request.
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let session = ctx.session();
    services
        .store
        .revoke_token(session.jti, session.expires_at)
        .await?;

    Ok(Json(MessageResponse {
        message: "logged out",
    }))
}

pub async fn current_user(Extension(ctx): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({ "user": UserResponse::from(ctx.account()) }))
}

fn issue_session(services: &AppServices, account: &UserAccount) -> Result<AuthResponse, ApiError> {
    let issued = services.jwt.issue(account.id, Utc::now())?;
    Ok(AuthResponse {
        user: UserResponse::from(account),
        token: issued.token,
        expires_at: issued.claims.expires_at.to_rfc3339(),
    })
}
