use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use taskboard_auth::{NewUser, UserAccount};
use taskboard_core::{TaskId, UserId};
use taskboard_tasks::{Task, TaskDraft, TaskFilter};

use super::{SessionStore, StoreError, StoreResult, TaskStore, UserStore};

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, UserAccount>,
    tasks: BTreeMap<TaskId, Task>,
    revoked: HashMap<Uuid, DateTime<Utc>>,
    last_user_id: i64,
    last_task_id: i64,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// In-memory store for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserAccount> {
        let mut state = self.write()?;
        if state.email_taken(&user.email, None) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }

        state.last_user_id += 1;
        let account = UserAccount {
            id: UserId::new(state.last_user_id),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        state.users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserAccount>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserAccount>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserAccount>> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn update_user(&self, user: &UserAccount) -> StoreResult<UserAccount> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if state.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.tasks.retain(|_, t| t.owner_id != id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl TaskStore for InMemoryStore {
    async fn insert_task(&self, draft: TaskDraft) -> StoreResult<Task> {
        let mut state = self.write()?;
        if !state.users.contains_key(&draft.owner_id) {
            return Err(StoreError::Conflict(format!("owner {} does not exist", draft.owner_id)));
        }

        state.last_task_id += 1;
        let task = Task::from_draft(TaskId::new(state.last_task_id), draft);
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound);
        }
        if !state.users.contains_key(&task.owner_id) {
            return Err(StoreError::Conflict(format!("owner {} does not exist", task.owner_id)));
        }
        state.tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> StoreResult<bool> {
        Ok(self.write()?.tasks.remove(&id).is_some())
    }

    async fn delete_tasks_created_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.write()?;
        let before = state.tasks.len();
        state
            .tasks
            .retain(|_, t| t.created_at < from || t.created_at >= until);
        Ok((before - state.tasks.len()) as u64)
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemoryStore {
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.write()?;
        let now = Utc::now();
        state.revoked.retain(|_, exp| *exp > now);
        state.revoked.insert(jti, expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        Ok(self.read()?.revoked.contains_key(&jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use taskboard_auth::Role;
    use taskboard_tasks::{NewTaskInput, TaskStatus};

    fn new_user(email: &str) -> NewUser {
        NewUser::new("Someone", email, "password", [Role::Editor], Utc::now()).unwrap()
    }

    fn draft(owner: UserId, title: &str, status: &str, at: DateTime<Utc>) -> TaskDraft {
        NewTaskInput {
            title: Some(title.to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
        .validate(owner, at.date_naive(), at)
        .unwrap()
    }

    #[tokio::test]
    async fn assigns_sequential_ids_and_rejects_duplicate_emails() {
        let store = InMemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).await.unwrap();
        let b = store.insert_user(new_user("b@example.com")).await.unwrap();
        assert_eq!((a.id.get(), b.id.get()), (1, 2));

        let dup = store.insert_user(new_user("a@example.com")).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
        assert_eq!(
            store.find_user_by_email("b@example.com").await.unwrap().map(|u| u.id),
            Some(b.id)
        );
    }

    #[tokio::test]
    async fn update_keeps_email_unique_except_for_self() {
        let store = InMemoryStore::new();
        let mut a = store.insert_user(new_user("a@example.com")).await.unwrap();
        store.insert_user(new_user("b@example.com")).await.unwrap();

        a.name = "Renamed".into();
        assert!(store.update_user(&a).await.is_ok());

        a.email = "b@example.com".into();
        assert!(matches!(store.update_user(&a).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn lists_newest_first_with_filters() {
        let store = InMemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).await.unwrap();
        let b = store.insert_user(new_user("b@example.com")).await.unwrap();
        let t0 = Utc::now();

        let old = store.insert_task(draft(a.id, "old", "pending", t0)).await.unwrap();
        let new = store
            .insert_task(draft(a.id, "new", "completed", t0 + Duration::seconds(5)))
            .await
            .unwrap();
        store.insert_task(draft(b.id, "other", "pending", t0)).await.unwrap();

        let mine = store
            .list_tasks(TaskFilter { owner: Some(a.id), status: None })
            .await
            .unwrap();
        assert_eq!(mine.iter().map(|t| t.id).collect::<Vec<_>>(), vec![new.id, old.id]);

        let pending = store
            .list_tasks(TaskFilter { owner: None, status: Some(TaskStatus::Pending) })
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
    }

    #[tokio::test]
    async fn tasks_require_existing_owner_and_cascade_on_user_delete() {
        let store = InMemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).await.unwrap();
        let now = Utc::now();

        let orphan = store.insert_task(draft(UserId::new(99), "x", "pending", now)).await;
        assert!(matches!(orphan, Err(StoreError::Conflict(_))));

        let task = store.insert_task(draft(a.id, "x", "pending", now)).await.unwrap();
        assert!(store.delete_user(a.id).await.unwrap());
        assert_eq!(store.get_task(task.id).await.unwrap(), None);
        assert!(!store.delete_user(a.id).await.unwrap());
    }

    #[tokio::test]
    async fn update_of_missing_task_is_not_found() {
        let store = InMemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).await.unwrap();
        let task = Task::from_draft(TaskId::new(42), draft(a.id, "x", "pending", Utc::now()));
        assert_eq!(store.update_task(&task).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn deletes_only_tasks_created_in_range() {
        let store = InMemoryStore::new();
        let a = store.insert_user(new_user("a@example.com")).await.unwrap();
        let t0 = Utc::now();

        let early = store
            .insert_task(draft(a.id, "early", "pending", t0 - Duration::days(400)))
            .await
            .unwrap();
        store.insert_task(draft(a.id, "in", "pending", t0)).await.unwrap();
        store.insert_task(draft(a.id, "edge", "pending", t0 - Duration::days(1))).await.unwrap();

        let deleted = store
            .delete_tasks_created_between(t0 - Duration::days(1), t0 + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let left = store.list_tasks(TaskFilter::default()).await.unwrap();
        assert_eq!(left.iter().map(|t| t.id).collect::<Vec<_>>(), vec![early.id]);
    }

    #[tokio::test]
    async fn revoked_tokens_are_remembered() {
        let store = InMemoryStore::new();
        let jti = Uuid::now_v7();
        assert!(!store.is_token_revoked(jti).await.unwrap());
        store
            .revoke_token(jti, Utc::now() + Duration::minutes(10))
            .await
            .unwrap();
        assert!(store.is_token_revoked(jti).await.unwrap());
    }
}
