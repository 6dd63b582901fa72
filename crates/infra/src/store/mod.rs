//! Persistence seams for users, tasks and sessions.
//!
//! The stores own every `UserAccount` and `Task` record. They do not
//! authorize anything: handlers ask the policy first and only then call in.
//! Concurrent writes to the same record are last-write-wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use taskboard_auth::{NewUser, UserAccount};
use taskboard_core::{TaskId, UserId};
use taskboard_tasks::{Task, TaskDraft, TaskFilter};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// These are infrastructure failures; "no such record" on a lookup is an
/// `Ok(None)`, not an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record to update does not exist (anymore).
    #[error("record not found")]
    NotFound,

    /// A uniqueness or reference constraint was violated.
    #[error("constraint violated: {0}")]
    Conflict(String),

    /// The backend failed (connection, lock poisoning, bad row data).
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new account. Fails with `Conflict` on a duplicate email.
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserAccount>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserAccount>>;

    /// Lookup by (already normalized) email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>>;

    /// All accounts, ordered by id.
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>>;

    async fn update_user(&self, user: &UserAccount) -> StoreResult<UserAccount>;

    /// Delete the account and every task it owns. Returns `false` if absent.
    async fn delete_user(&self, id: UserId) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task. Fails with `Conflict` if the owner does not exist.
    async fn insert_task(&self, draft: TaskDraft) -> StoreResult<Task>;

    async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Matching tasks, newest first.
    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>>;

    async fn update_task(&self, task: &Task) -> StoreResult<Task>;

    async fn delete_task(&self, id: TaskId) -> StoreResult<bool>;

    /// Delete every task with `from <= created_at < until`; returns how many.
    async fn delete_tasks_created_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<u64>;
}

/// Revocation list for bearer tokens (logout).
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Revoke a token id until it would have expired anyway.
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()>;

    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool>;
}

/// Everything the API needs from persistence.
pub trait Store: UserStore + TaskStore + SessionStore {}

impl<T> Store for T where T: UserStore + TaskStore + SessionStore + ?Sized {}

/// Shared store handle.
pub type DynStore = Arc<dyn Store>;
