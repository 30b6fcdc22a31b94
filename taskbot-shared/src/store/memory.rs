/// In-memory store for tests and local experiments

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Store, StoreError, StoreResult};
use crate::models::allowed_user::{normalize_handle, AllowedUser};
use crate::models::comment::{Comment, NewComment};
use crate::models::history::{HistoryEntry, NewHistoryEntry};
use crate::models::notification::{NotificationKind, NotificationRecord};
use crate::models::settings::NotificationSettings;
use crate::models::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{NewUser, Role, User};

/// Thread-safe in-memory store
///
/// Mirrors the constraints of the PostgreSQL schema that the bot relies on:
/// unique external ids and allow-list handles, foreign keys to users and
/// tasks, non-empty titles and comments, and one record per `(task_id, kind)`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    external_index: HashMap<String, i64>,
    allowed: HashMap<String, AllowedUser>,
    tasks: BTreeMap<i64, Task>,
    notifications: Vec<NotificationRecord>,
    history: Vec<HistoryEntry>,
    comments: Vec<Comment>,
    settings: HashMap<i64, NotificationSettings>,
    next_user_id: i64,
    next_allowed_id: i64,
    next_task_id: i64,
    next_history_id: i64,
    next_comment_id: i64,
}

impl MemoryState {
    fn require_user(&self, user_id: i64) -> StoreResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!("user {} does not exist", user_id)))
        }
    }

    fn require_task(&self, task_id: i64) -> StoreResult<()> {
        if self.tasks.contains_key(&task_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!("task {} does not exist", task_id)))
        }
    }
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Replaces a stored task row, e.g. to backdate `created_at`
    pub fn put_task(&self, task: Task) -> StoreResult<()> {
        let mut state = self.write()?;
        state.next_task_id = state.next_task_id.max(task.id);
        state.tasks.insert(task.id, task);
        Ok(())
    }

    /// Every recorded notification, in insertion order
    pub fn notifications(&self) -> StoreResult<Vec<NotificationRecord>> {
        Ok(self.read()?.notifications.clone())
    }

    /// Number of stored tasks
    pub fn task_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.tasks.len())
    }

    /// Number of stored users
    pub fn user_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.users.len())
    }

    /// Every history entry, in insertion order
    pub fn history(&self) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.read()?.history.clone())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.check_available()?;
        self.state
            .read()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.check_available()?;
        self.state
            .write()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        let state = self.read()?;
        Ok(state
            .external_index
            .get(external_id)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn register_user(&self, data: NewUser) -> StoreResult<User> {
        let mut state = self.write()?;
        let now = Utc::now();

        if let Some(id) = state.external_index.get(&data.external_id).copied() {
            let user = state
                .users
                .get_mut(&id)
                .ok_or_else(|| StoreError::Constraint("dangling external id index".to_string()))?;
            user.first_name = data.first_name;
            user.last_name = data.last_name;
            user.handle = data.handle;
            user.updated_at = now;
            return Ok(user.clone());
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            external_id: data.external_id,
            first_name: data.first_name,
            last_name: data.last_name,
            handle: data.handle,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        state.external_index.insert(user.external_id.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_handle(&self, handle: &str) -> StoreResult<Option<User>> {
        let handle = normalize_handle(handle);
        Ok(self
            .read()?
            .users
            .values()
            .find(|user| {
                user.handle
                    .as_deref()
                    .is_some_and(|own| normalize_handle(own) == handle)
            })
            .cloned())
    }

    async fn set_user_role(&self, id: i64, role: Role) -> StoreResult<Option<User>> {
        let mut state = self.write()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn list_admins(&self) -> StoreResult<Vec<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .filter(|user| user.is_admin())
            .cloned()
            .collect())
    }

    async fn find_allowed_user(&self, handle: &str) -> StoreResult<Option<AllowedUser>> {
        Ok(self.read()?.allowed.get(&normalize_handle(handle)).cloned())
    }

    async fn allow_user(
        &self,
        handle: &str,
        role: Role,
        added_by: Option<i64>,
    ) -> StoreResult<AllowedUser> {
        let mut state = self.write()?;
        let handle = normalize_handle(handle);

        if let Some(entry) = state.allowed.get_mut(&handle) {
            entry.role = role;
            return Ok(entry.clone());
        }

        state.next_allowed_id += 1;
        let entry = AllowedUser {
            id: state.next_allowed_id,
            handle: handle.clone(),
            role,
            added_by,
            created_at: Utc::now(),
        };
        state.allowed.insert(handle, entry.clone());
        Ok(entry)
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        let mut state = self.write()?;

        if data.title.is_empty() {
            return Err(StoreError::Constraint("task title must not be empty".to_string()));
        }
        state.require_user(data.assignee_id)?;
        state.require_user(data.creator_id)?;

        let now = Utc::now();
        state.next_task_id += 1;
        let task = Task {
            id: state.next_task_id,
            title: data.title,
            description: data.description,
            priority: data.priority,
            status: TaskStatus::Pending,
            due_date: data.due_date,
            assignee_id: data.assignee_id,
            creator_id: data.creator_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read()?
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn update_task_status(
        &self,
        id: i64,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut state = self.write()?;
        Ok(state.tasks.get_mut(&id).map(|task| {
            task.completed_at = if status == TaskStatus::Completed {
                task.completed_at.or(Some(at))
            } else {
                None
            };
            task.status = status;
            task.updated_at = at;
            task.clone()
        }))
    }

    async fn open_tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .read()?
            .tasks
            .values()
            .filter(|task| !task.status.is_closed())
            .filter(|task| task.due_date >= from && task.due_date <= to)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn notification_sent(&self, task_id: i64, kind: NotificationKind) -> StoreResult<bool> {
        Ok(self
            .read()?
            .notifications
            .iter()
            .any(|record| record.task_id == task_id && record.kind == kind))
    }

    async fn record_notification(
        &self,
        task_id: i64,
        kind: NotificationKind,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;

        state.require_task(task_id)?;
        if state
            .notifications
            .iter()
            .any(|record| record.task_id == task_id && record.kind == kind)
        {
            return Ok(false);
        }

        state.notifications.push(NotificationRecord {
            task_id,
            kind,
            sent_at,
        });
        Ok(true)
    }

    async fn record_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        let mut state = self.write()?;
        state.require_task(entry.task_id)?;
        state.require_user(entry.user_id)?;

        state.next_history_id += 1;
        let entry = HistoryEntry {
            id: state.next_history_id,
            task_id: entry.task_id,
            user_id: entry.user_id,
            change_type: entry.change_type,
            old_value: entry.old_value,
            new_value: entry.new_value,
            created_at: entry.at,
        };
        state.history.push(entry.clone());
        Ok(entry)
    }

    async fn task_history(&self, task_id: i64, limit: i64) -> StoreResult<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = self
            .read()?
            .history
            .iter()
            .filter(|entry| entry.task_id == task_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }

    async fn add_comment(&self, data: NewComment) -> StoreResult<Comment> {
        let mut state = self.write()?;
        if data.body.is_empty() {
            return Err(StoreError::Constraint("comment must not be empty".to_string()));
        }
        state.require_task(data.task_id)?;
        state.require_user(data.user_id)?;

        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            task_id: data.task_id,
            user_id: data.user_id,
            body: data.body,
            created_at: data.at,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: i64, limit: i64) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .read()?
            .comments
            .iter()
            .filter(|comment| comment.task_id == task_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let keep = usize::try_from(limit).unwrap_or(0);
        let skip = comments.len().saturating_sub(keep);
        Ok(comments.split_off(skip))
    }

    async fn notification_settings(&self, user_id: i64) -> StoreResult<NotificationSettings> {
        Ok(self
            .read()?
            .settings
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| NotificationSettings::defaults(user_id, Utc::now())))
    }

    async fn save_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> StoreResult<NotificationSettings> {
        let mut state = self.write()?;
        state.require_user(settings.user_id)?;
        if settings.quiet_start.is_some() != settings.quiet_end.is_some() {
            return Err(StoreError::Constraint(
                "quiet hours need both a start and an end".to_string(),
            ));
        }
        state.settings.insert(settings.user_id, settings.clone());
        Ok(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::task::TaskPriority;

    fn new_user(external_id: &str, role: Role) -> NewUser {
        NewUser {
            external_id: external_id.to_string(),
            first_name: Some("Test".to_string()),
            last_name: None,
            handle: None,
            role,
        }
    }

    fn new_task(assignee_id: i64, creator_id: i64) -> NewTask {
        NewTask {
            title: "Write report".to_string(),
            description: String::new(),
            priority: TaskPriority::Medium,
            due_date: Utc::now() + Duration::hours(2),
            assignee_id,
            creator_id,
        }
    }

    #[tokio::test]
    async fn test_register_is_upsert() {
        let store = MemoryStore::new();
        let first = store.register_user(new_user("1", Role::Admin)).await.unwrap();

        let mut again = new_user("1", Role::Employee);
        again.handle = Some("boss".to_string());
        let second = store.register_user(again).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Admin);
        assert_eq!(second.handle.as_deref(), Some("boss"));
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_task_requires_existing_users() {
        let store = MemoryStore::new();
        let admin = store.register_user(new_user("1", Role::Admin)).await.unwrap();

        let err = store.create_task(new_task(99, admin.id)).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.task_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_completed_at_follows_status() {
        let store = MemoryStore::new();
        let admin = store.register_user(new_user("1", Role::Admin)).await.unwrap();
        let task = store.create_task(new_task(admin.id, admin.id)).await.unwrap();
        let now = Utc::now();

        let done = store
            .update_task_status(task.id, TaskStatus::Completed, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.completed_at, Some(now));

        let reopened = store
            .update_task_status(task.id, TaskStatus::InProgress, now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reopened.completed_at, None);
    }

    #[tokio::test]
    async fn test_record_notification_once() {
        let store = MemoryStore::new();
        let admin = store.register_user(new_user("1", Role::Admin)).await.unwrap();
        let task = store.create_task(new_task(admin.id, admin.id)).await.unwrap();
        let now = Utc::now();

        assert!(store
            .record_notification(task.id, NotificationKind::FourHours, now)
            .await
            .unwrap());
        assert!(!store
            .record_notification(task.id, NotificationKind::FourHours, now)
            .await
            .unwrap());
        assert!(store
            .notification_sent(task.id, NotificationKind::FourHours)
            .await
            .unwrap());
        assert!(!store
            .notification_sent(task.id, NotificationKind::EightHours)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_history_newest_first_with_limit() {
        let store = MemoryStore::new();
        let admin = store.register_user(new_user("1", Role::Admin)).await.unwrap();
        let task = store.create_task(new_task(admin.id, admin.id)).await.unwrap();
        let start = Utc::now();

        store
            .record_history(NewHistoryEntry::created(task.id, admin.id, "Write report", start))
            .await
            .unwrap();
        for minute in 1..=3 {
            store
                .record_history(NewHistoryEntry::comment(
                    task.id,
                    admin.id,
                    &format!("note {}", minute),
                    start + Duration::minutes(minute),
                ))
                .await
                .unwrap();
        }

        let latest = store.task_history(task.id, 2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].new_value.as_deref(), Some("note 3"));
        assert_eq!(latest[1].new_value.as_deref(), Some("note 2"));

        let err = store
            .record_history(NewHistoryEntry::created(99, admin.id, "x", start))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_comments_keep_latest_in_order() {
        let store = MemoryStore::new();
        let admin = store.register_user(new_user("1", Role::Admin)).await.unwrap();
        let task = store.create_task(new_task(admin.id, admin.id)).await.unwrap();
        let start = Utc::now();

        for minute in 0..5 {
            store
                .add_comment(NewComment {
                    task_id: task.id,
                    user_id: admin.id,
                    body: format!("c{}", minute),
                    at: start + Duration::minutes(minute),
                })
                .await
                .unwrap();
        }

        let bodies: Vec<String> = store
            .list_comments(task.id, 3)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, ["c2", "c3", "c4"]);
    }

    #[tokio::test]
    async fn test_settings_default_until_saved() {
        let store = MemoryStore::new();
        let user = store.register_user(new_user("1", Role::Employee)).await.unwrap();

        let mut settings = store.notification_settings(user.id).await.unwrap();
        assert!(settings.comments);
        assert_eq!(settings.quiet_hours(), None);

        settings.comments = false;
        store.save_notification_settings(&settings).await.unwrap();
        assert!(!store.notification_settings(user.id).await.unwrap().comments);

        let orphan = NotificationSettings::defaults(42, Utc::now());
        assert!(store.save_notification_settings(&orphan).await.is_err());
    }

    #[tokio::test]
    async fn test_find_user_by_handle_ignores_case() {
        let store = MemoryStore::new();
        let mut data = new_user("1", Role::Employee);
        data.handle = Some("Anna_K".to_string());
        let anna = store.register_user(data).await.unwrap();

        let found = store.find_user_by_handle("@anna_k").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(anna.id));
        assert!(store.find_user_by_handle("boris").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
