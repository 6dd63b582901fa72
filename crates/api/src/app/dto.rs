use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use taskboard_auth::UserAccount;
use taskboard_core::UserId;
use taskboard_tasks::{NewTaskInput, Task, TaskPatchInput};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>,
    /// Owner of the new task; defaults to the caller.
    pub user_id: Option<UserId>,
}

impl CreateTaskRequest {
    pub fn into_input(self) -> (NewTaskInput, Option<UserId>) {
        let input = NewTaskInput {
            title: self.title,
            description: self.description,
            status: self.status,
            due_date: self.due_date,
        };
        (input, self.user_id)
    }
}

/// Partial task update. `null` clears `description`/`due_date`, absence
/// leaves them alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<String>>,
    pub user_id: Option<UserId>,
}

impl From<UpdateTaskRequest> for TaskPatchInput {
    fn from(body: UpdateTaskRequest) -> Self {
        TaskPatchInput {
            title: body.title,
            description: body.description,
            status: body.status,
            due_date: body.due_date,
            owner_id: body.user_id,
        }
    }
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub roles: Vec<&'static str>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserAccount> for UserResponse {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            roles: user.roles.iter().map(|r| r.as_str()).collect(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// The owner summary embedded in task responses.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOwner {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&UserAccount> for TaskOwner {
    fn from(user: &UserAccount) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: taskboard_core::TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: &'static str,
    pub due_date: Option<String>,
    pub user_id: UserId,
    pub created_at: String,
    pub updated_at: String,
    pub user: Option<TaskOwner>,
}

impl TaskResponse {
    pub fn new(task: &Task, owner: Option<TaskOwner>) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.as_str(),
            due_date: task.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
            user_id: task.owner_id,
            created_at: task.created_at.to_rfc3339(),
            updated_at: task.updated_at.to_rfc3339(),
            user: owner,
        }
    }
}

/// Map a batch of tasks, embedding each owner from `owners`.
pub fn task_list(tasks: &[Task], owners: &BTreeMap<UserId, TaskOwner>) -> Vec<TaskResponse> {
    tasks
        .iter()
        .map(|t| TaskResponse::new(t, owners.get(&t.owner_id).cloned()))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_from_absent() {
        let body: UpdateTaskRequest =
            serde_json::from_str(r#"{"description": null, "title": "x"}"#).unwrap();
        assert_eq!(body.description, Some(None));
        assert_eq!(body.due_date, None);
        assert_eq!(body.title.as_deref(), Some("x"));

        let body: UpdateTaskRequest = serde_json::from_str(r#"{"due_date": "2030-01-01"}"#).unwrap();
        assert_eq!(body.due_date, Some(Some("2030-01-01".to_string())));
    }

    #[test]
    fn create_request_carries_requested_owner() {
        let body: CreateTaskRequest =
            serde_json::from_str(r#"{"title": "t", "user_id": 7}"#).unwrap();
        let (input, owner) = body.into_input();
        assert_eq!(input.title.as_deref(), Some("t"));
        assert_eq!(owner, Some(UserId::new(7)));
    }
}
