//! Postgres-backed store.
//!
//! Schema is created by [`PostgresStore::migrate`]. Tasks reference their
//! owner with `ON DELETE CASCADE`, so deleting a user removes their tasks in
//! the same statement.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use taskboard_auth::{NewUser, Role, UserAccount};
use taskboard_core::{TaskId, UserId};
use taskboard_tasks::{Task, TaskDraft, TaskFilter, TaskStatus};

use super::{SessionStore, StoreError, StoreResult, TaskStore, UserStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            BIGSERIAL PRIMARY KEY,
        name          TEXT NOT NULL,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        roles         TEXT[] NOT NULL DEFAULT '{}',
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id          BIGSERIAL PRIMARY KEY,
        title       VARCHAR(255) NOT NULL,
        description TEXT,
        status      TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'in_progress', 'completed')),
        due_date    DATE,
        user_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS tasks_user_id_idx ON tasks (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS revoked_tokens (
        jti        UUID PRIMARY KEY,
        expires_at TIMESTAMPTZ NOT NULL
    )
    "#,
];

const USER_COLUMNS: &str = "id, name, email, password_hash, roles, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, title, description, status, due_date, user_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserAccount> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, roles, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(role_names(&user.roles))
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        user_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?
            .as_ref()
            .map(user_from_row)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?
            .iter()
            .map(user_from_row)
            .collect()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &UserAccount) -> StoreResult<UserAccount> {
        let sql = format!(
            "UPDATE users SET name = $2, email = $3, password_hash = $4, roles = $5, updated_at = $6 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.get())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(role_names(&user.roles))
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl TaskStore for PostgresStore {
    #[instrument(skip(self, draft), fields(owner_id = %draft.owner_id))]
    async fn insert_task(&self, draft: TaskDraft) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (title, description, status, due_date, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(draft.status.as_str())
            .bind(draft.due_date)
            .bind(draft.owner_id.get())
            .bind(draft.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_task", e))?;
        task_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_task", e))?
            .as_ref()
            .map(task_from_row)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks \
             WHERE ($1::BIGINT IS NULL OR user_id = $1) AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query(&sql)
            .bind(filter.owner.map(i64::from))
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_tasks", e))?
            .iter()
            .map(task_from_row)
            .collect()
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let sql = format!(
            "UPDATE tasks SET title = $2, description = $3, status = $4, due_date = $5, \
             user_id = $6, updated_at = $7 WHERE id = $1 RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(task.id.get())
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status.as_str())
            .bind(task.due_date)
            .bind(task.owner_id.get())
            .bind(task.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_task", e))?
            .ok_or(StoreError::NotFound)?;
        task_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn delete_task(&self, id: TaskId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_task", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_tasks_created_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE created_at >= $1 AND created_at < $2")
            .bind(from)
            .bind(until)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_tasks_created_between", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresStore {
    #[instrument(skip(self))]
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("revoke_token", e))?;

        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) \
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_token", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM revoked_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("is_token_revoked", e))?;
        Ok(row.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn role_names(roles: &BTreeSet<Role>) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

fn user_from_row(row: &PgRow) -> StoreResult<UserAccount> {
    let roles: Vec<String> = column(row, "roles")?;
    let roles = roles
        .iter()
        .map(|r| Role::from_str(r).map_err(|e| StoreError::Backend(e.to_string())))
        .collect::<StoreResult<BTreeSet<Role>>>()?;

    Ok(UserAccount {
        id: UserId::new(column(row, "id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        roles,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn task_from_row(row: &PgRow) -> StoreResult<Task> {
    let status: String = column(row, "status")?;
    Ok(Task {
        id: TaskId::new(column(row, "id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        status: TaskStatus::from_str(&status).map_err(|e| StoreError::Backend(e.to_string()))?,
        due_date: column::<Option<NaiveDate>>(row, "due_date")?,
        owner_id: UserId::new(column(row, "user_id")?),
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("column '{name}': {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                // unique / foreign key violation
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}
