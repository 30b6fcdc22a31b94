/// PostgreSQL-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{Store, StoreError, StoreResult};
use crate::db::pool;
use crate::models::allowed_user::AllowedUser;
use crate::models::comment::{Comment, NewComment};
use crate::models::history::{HistoryEntry, NewHistoryEntry};
use crate::models::notification::{NotificationKind, NotificationRecord};
use crate::models::settings::NotificationSettings;
use crate::models::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{NewUser, Role, User};

/// Store backed by a sqlx connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps constraint violations to [`StoreError::Constraint`]
fn map_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.constraint().is_some() => {
            StoreError::Constraint(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        pool::ping(&self.pool).await.map_err(map_err)
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>> {
        User::find_by_external_id(&self.pool, external_id)
            .await
            .map_err(map_err)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        User::find_by_id(&self.pool, id).await.map_err(map_err)
    }

    async fn register_user(&self, data: NewUser) -> StoreResult<User> {
        User::register(&self.pool, data).await.map_err(map_err)
    }

    async fn find_user_by_handle(&self, handle: &str) -> StoreResult<Option<User>> {
        User::find_by_handle(&self.pool, handle).await.map_err(map_err)
    }

    async fn set_user_role(&self, id: i64, role: Role) -> StoreResult<Option<User>> {
        User::set_role(&self.pool, id, role).await.map_err(map_err)
    }

    async fn list_admins(&self) -> StoreResult<Vec<User>> {
        User::list_admins(&self.pool).await.map_err(map_err)
    }

    async fn find_allowed_user(&self, handle: &str) -> StoreResult<Option<AllowedUser>> {
        AllowedUser::find_by_handle(&self.pool, handle)
            .await
            .map_err(map_err)
    }

    async fn allow_user(
        &self,
        handle: &str,
        role: Role,
        added_by: Option<i64>,
    ) -> StoreResult<AllowedUser> {
        AllowedUser::upsert(&self.pool, handle, role, added_by)
            .await
            .map_err(map_err)
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        Task::create(&self.pool, data).await.map_err(map_err)
    }

    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Task::find_by_id(&self.pool, id).await.map_err(map_err)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Task::list(&self.pool, filter).await.map_err(map_err)
    }

    async fn update_task_status(
        &self,
        id: i64,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        Task::update_status(&self.pool, id, status, at)
            .await
            .map_err(map_err)
    }

    async fn open_tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        Task::open_due_between(&self.pool, from, to)
            .await
            .map_err(map_err)
    }

    async fn notification_sent(&self, task_id: i64, kind: NotificationKind) -> StoreResult<bool> {
        NotificationRecord::exists(&self.pool, task_id, kind)
            .await
            .map_err(map_err)
    }

    async fn record_notification(
        &self,
        task_id: i64,
        kind: NotificationKind,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        NotificationRecord::record(&self.pool, task_id, kind, sent_at)
            .await
            .map_err(map_err)
    }

    async fn record_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        HistoryEntry::record(&self.pool, entry).await.map_err(map_err)
    }

    async fn task_history(&self, task_id: i64, limit: i64) -> StoreResult<Vec<HistoryEntry>> {
        HistoryEntry::list_for_task(&self.pool, task_id, limit)
            .await
            .map_err(map_err)
    }

    async fn add_comment(&self, data: NewComment) -> StoreResult<Comment> {
        Comment::create(&self.pool, data).await.map_err(map_err)
    }

    async fn list_comments(&self, task_id: i64, limit: i64) -> StoreResult<Vec<Comment>> {
        Comment::list_for_task(&self.pool, task_id, limit)
            .await
            .map_err(map_err)
    }

    async fn notification_settings(&self, user_id: i64) -> StoreResult<NotificationSettings> {
        let stored = NotificationSettings::find(&self.pool, user_id)
            .await
            .map_err(map_err)?;
        Ok(stored.unwrap_or_else(|| NotificationSettings::defaults(user_id, Utc::now())))
    }

    async fn save_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> StoreResult<NotificationSettings> {
        NotificationSettings::save(&self.pool, settings)
            .await
            .map_err(map_err)
    }
}
