use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use taskboard_auth::{TaskAction, policy};
use taskboard_core::{DomainError, TaskId, UserId};
use taskboard_infra::{DynStore, StoreError};
use taskboard_tasks::{Task, TaskFilter, TaskPatchInput, TaskStatus};

use crate::app::dto::{
    self, CreateTaskRequest, ListTasksQuery, MessageResponse, TaskOwner, TaskResponse,
    UpdateTaskRequest,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz::enforce;
use crate::context::PrincipalContext;

const UNKNOWN_OWNER: &str = "the selected user id is invalid";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
}

/// Admins see every task, everyone else only their own. Newest first.
pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Query(query): Query<ListTasksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<TaskStatus>()
                .map_err(|e| ApiError::validation("status", e.to_string()))?,
        ),
    };

    let scope = policy::can_list_tasks(ctx.principal());
    let filter = TaskFilter {
        owner: scope.owner_filter(ctx.principal()),
        status,
    };

    let tasks = services.store.list_tasks(filter).await?;
    let owners = load_owners(&services.store, &tasks).await?;
    Ok(Json(dto::task_list(&tasks, &owners)))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let (input, requested_owner) = body.into_input();

    enforce(
        &ctx,
        "tasks.create",
        policy::can_create_task(ctx.principal(), requested_owner),
    )?;

    let owner_id = requested_owner.unwrap_or(ctx.principal().id);
    let owner = services.store.get_user(owner_id).await?;

    let now = Utc::now();
    let draft = match (input.validate(owner_id, now.date_naive(), now), &owner) {
        (Ok(draft), Some(_)) => draft,
        (Ok(_), None) => return Err(ApiError::validation("user_id", UNKNOWN_OWNER)),
        (Err(DomainError::Validation(mut errors)), None) => {
            errors.add("user_id", UNKNOWN_OWNER);
            return Err(ApiError::Validation(errors));
        }
        (Err(e), _) => return Err(e.into()),
    };

    let task = services.store.insert_task(draft).await.map_err(owner_conflict)?;
    tracing::info!(task_id = %task.id, owner_id = %task.owner_id, "task created");

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new(&task, owner.as_ref().map(TaskOwner::from))),
    ))
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = load_task(&services.store, &id).await?;
    enforce(&ctx, "tasks.view", policy::can_view_task(ctx.principal(), task.owner_id))?;

    let owner = owner_of(&services.store, &task).await?;
    Ok(Json(TaskResponse::new(&task, owner)))
}

pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&ctx, "tasks.update", policy::can_attempt_task_mutation(ctx.principal()))?;

    let mut task = load_task(&services.store, &id).await?;
    enforce(
        &ctx,
        "tasks.update",
        policy::can_mutate_task(ctx.principal(), task.owner_id, TaskAction::Update),
    )?;

    let Json(body) = body?;
    let input = TaskPatchInput::from(body);

    let new_owner = input.reassignment(&task);
    if new_owner.is_some() {
        enforce(&ctx, "tasks.reassign", policy::can_reassign_task(ctx.principal()))?;
    }

    let patch = input.validate()?;
    if let Some(owner_id) = new_owner {
        if services.store.get_user(owner_id).await?.is_none() {
            return Err(ApiError::validation("user_id", UNKNOWN_OWNER));
        }
    }

    task.apply(patch, Utc::now());
    let task = services.store.update_task(&task).await.map_err(owner_conflict)?;
    if let Some(owner_id) = new_owner {
        tracing::info!(task_id = %task.id, owner_id = %owner_id, "task reassigned");
    }

    let owner = owner_of(&services.store, &task).await?;
    Ok(Json(TaskResponse::new(&task, owner)))
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&ctx, "tasks.delete", policy::can_attempt_task_mutation(ctx.principal()))?;

    let task = load_task(&services.store, &id).await?;
    enforce(
        &ctx,
        "tasks.delete",
        policy::can_mutate_task(ctx.principal(), task.owner_id, TaskAction::Delete),
    )?;

    if !services.store.delete_task(task.id).await? {
        return Err(ApiError::NotFound);
    }

    Ok(Json(MessageResponse {
        message: "task deleted",
    }))
}

// -------------------------
// Helpers
// -------------------------

async fn load_task(store: &DynStore, raw_id: &str) -> Result<Task, ApiError> {
    let id: TaskId = raw_id.parse()?;
    store.get_task(id).await?.ok_or(ApiError::NotFound)
}

async fn owner_of(store: &DynStore, task: &Task) -> Result<Option<TaskOwner>, ApiError> {
    Ok(store.get_user(task.owner_id).await?.as_ref().map(TaskOwner::from))
}

async fn load_owners(store: &DynStore, tasks: &[Task]) -> Result<BTreeMap<UserId, TaskOwner>, ApiError> {
    let mut owners = BTreeMap::new();
    for task in tasks {
        if owners.contains_key(&task.owner_id) {
            continue;
        }
        if let Some(user) = store.get_user(task.owner_id).await? {
            owners.insert(user.id, TaskOwner::from(&user));
        }
    }
    Ok(owners)
}

/// The owner vanished between the existence check and the write.
fn owner_conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(_) => ApiError::validation("user_id", UNKNOWN_OWNER),
        other => other.into(),
    }
}
