//! Demo accounts and tasks for local development, and the matching cleanup.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use tracing::info;

use taskboard_auth::{NewUser, Role, UserAccount};
use taskboard_core::DomainError;
use taskboard_tasks::{NewTaskInput, TaskFilter, TaskStatus};

use crate::store::{Store, StoreError, StoreResult};

pub const DEMO_PASSWORD: &str = "password";

const DEMO_USERS: &[(&str, &str, Role)] = &[
    ("Admin User", "admin@example.com", Role::Admin),
    ("Editor User", "editor@example.com", Role::Editor),
    ("Viewer User", "viewer@example.com", Role::Viewer),
];

const DEMO_TASKS: &[(&str, TaskStatus, u64)] = &[
    ("Review open pull requests", TaskStatus::Pending, 3),
    ("Write release notes", TaskStatus::InProgress, 7),
    ("Archive last sprint board", TaskStatus::Completed, 14),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub tasks_created: usize,
}

/// Create the demo admin, editor and viewer accounts, each with a few tasks.
///
/// Idempotent: accounts that already exist (by email) are left untouched, and
/// demo tasks go only to demo accounts that currently own no tasks.
pub async fn seed_demo_data(store: &dyn Store, now: DateTime<Utc>) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();

    for (name, email, role) in DEMO_USERS {
        let user = match store.find_user_by_email(email).await? {
            Some(existing) => existing,
            None => {
                let new_user = NewUser::new(*name, *email, DEMO_PASSWORD, [*role], now)
                    .map_err(|e| StoreError::Backend(format!("demo account {email}: {e}")))?;
                report.users_created += 1;
                store.insert_user(new_user).await?
            }
        };

        let owned = store
            .list_tasks(TaskFilter { owner: Some(user.id), status: None })
            .await?;
        if owned.is_empty() {
            report.tasks_created += seed_tasks_for(store, &user, now).await?;
        }
    }

    info!(
        users_created = report.users_created,
        tasks_created = report.tasks_created,
        "demo data seeded"
    );
    Ok(report)
}

async fn seed_tasks_for(store: &dyn Store, user: &UserAccount, now: DateTime<Utc>) -> StoreResult<usize> {
    let today = now.date_naive();
    let mut created = 0;

    for (title, status, days_ahead) in DEMO_TASKS {
        let due = today
            .checked_add_days(Days::new(*days_ahead))
            .map(|d| d.format("%Y-%m-%d").to_string());
        let draft = NewTaskInput {
            title: Some(format!("{title} ({})", user.name)),
            description: Some(format!("Demo task for {}", user.email)),
            status: Some(status.as_str().to_string()),
            due_date: due,
        }
        .validate(user.id, today, now)
        .map_err(invalid_demo_data)?;

        store.insert_task(draft).await?;
        created += 1;
    }
    Ok(created)
}

/// Delete every task created during the calendar year (UTC) of `now`, so
/// demo data can be seeded afresh. Returns how many tasks were removed.
pub async fn clear_task_data(store: &dyn Store, now: DateTime<Utc>) -> StoreResult<u64> {
    let year = now.year();
    let (Some(from), Some(until)) = (start_of_year(year), start_of_year(year + 1)) else {
        return Err(StoreError::Backend(format!("year {year} out of range")));
    };

    let deleted = store.delete_tasks_created_between(from, until).await?;
    info!(year, deleted, "task data cleared");
    Ok(deleted)
}

fn start_of_year(year: i32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, 1, 1)?
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
}

fn invalid_demo_data(err: DomainError) -> StoreError {
    StoreError::Backend(format!("invalid demo data: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, TaskStore, UserStore};

    #[tokio::test]
    async fn seeds_three_roles_once() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let first = seed_demo_data(&store, now).await.unwrap();
        assert_eq!(first, SeedReport { users_created: 3, tasks_created: 9 });

        let second = seed_demo_data(&store, now).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let admin = store.find_user_by_email("admin@example.com").await.unwrap().unwrap();
        assert!(admin.principal().is_admin());
        assert!(admin.check_password(DEMO_PASSWORD));

        let tasks = store.list_tasks(TaskFilter::default()).await.unwrap();
        assert_eq!(tasks.len(), 9);
    }

    #[tokio::test]
    async fn clearing_removes_this_years_tasks_and_allows_reseeding() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        seed_demo_data(&store, now).await.unwrap();

        assert_eq!(clear_task_data(&store, now).await.unwrap(), 9);
        assert!(store.list_tasks(TaskFilter::default()).await.unwrap().is_empty());
        assert_eq!(clear_task_data(&store, now).await.unwrap(), 0);

        assert_eq!(store.list_users().await.unwrap().len(), 3);
        assert_eq!(
            seed_demo_data(&store, now).await.unwrap(),
            SeedReport { users_created: 0, tasks_created: 9 }
        );
    }

    #[test]
    fn year_bounds_are_midnight_utc() {
        let start = start_of_year(2030).unwrap();
        assert_eq!(start.to_rfc3339(), "2030-01-01T00:00:00+00:00");
    }
}
