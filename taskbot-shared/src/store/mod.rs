/// Persistence port
///
/// Every read and write the bot performs goes through the [`Store`] trait so
/// the dispatcher, task operations and scheduler can run against PostgreSQL
/// in production and an in-memory map in tests.
///
/// - `postgres`: [`PgStore`], backed by the model queries in `crate::models`
/// - `memory`: [`MemoryStore`], a thread-safe in-memory implementation
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskbot_shared::store::{MemoryStore, Store};
///
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::allowed_user::AllowedUser;
use crate::models::comment::{Comment, NewComment};
use crate::models::history::{HistoryEntry, NewHistoryEntry};
use crate::models::notification::NotificationKind;
use crate::models::settings::NotificationSettings;
use crate::models::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::models::user::{NewUser, Role, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema constraint rejected the write
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The backing store cannot be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations used by the bot
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the store is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Looks up a user by chat platform identifier
    async fn find_user_by_external_id(&self, external_id: &str) -> StoreResult<Option<User>>;

    /// Looks up a user by internal identifier
    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    /// Creates a user or refreshes the profile of an existing one
    ///
    /// The role in `data` applies only when the row is created.
    async fn register_user(&self, data: NewUser) -> StoreResult<User>;

    /// Looks up a user by handle (case-insensitive, `@` optional)
    async fn find_user_by_handle(&self, handle: &str) -> StoreResult<Option<User>>;

    /// Changes the role of a user; None if the user does not exist
    async fn set_user_role(&self, id: i64, role: Role) -> StoreResult<Option<User>>;

    /// Every administrator, oldest first
    async fn list_admins(&self) -> StoreResult<Vec<User>>;

    /// Looks up an allow-list entry by handle (case-insensitive)
    async fn find_allowed_user(&self, handle: &str) -> StoreResult<Option<AllowedUser>>;

    /// Adds or updates an allow-list entry
    async fn allow_user(
        &self,
        handle: &str,
        role: Role,
        added_by: Option<i64>,
    ) -> StoreResult<AllowedUser>;

    /// Inserts a task in pending state
    async fn create_task(&self, data: NewTask) -> StoreResult<Task>;

    /// Looks up a task by identifier
    async fn find_task(&self, id: i64) -> StoreResult<Option<Task>>;

    /// Tasks matching the filter, newest first
    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Sets a task's status, maintaining `completed_at`; None if not found
    async fn update_task_status(
        &self,
        id: i64,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    /// Open tasks with `from <= due_date <= to`, earliest deadline first
    async fn open_tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>>;

    /// Whether a one-shot notification was already recorded
    async fn notification_sent(&self, task_id: i64, kind: NotificationKind) -> StoreResult<bool>;

    /// Records a one-shot notification; false if it was already recorded
    async fn record_notification(
        &self,
        task_id: i64,
        kind: NotificationKind,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Appends a task history entry
    async fn record_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry>;

    /// The latest `limit` history entries of a task, newest first
    async fn task_history(&self, task_id: i64, limit: i64) -> StoreResult<Vec<HistoryEntry>>;

    /// Adds a comment to a task
    async fn add_comment(&self, data: NewComment) -> StoreResult<Comment>;

    /// The latest `limit` comments of a task, oldest first
    async fn list_comments(&self, task_id: i64, limit: i64) -> StoreResult<Vec<Comment>>;

    /// Stored settings of a user, or the defaults when none were saved
    async fn notification_settings(&self, user_id: i64) -> StoreResult<NotificationSettings>;

    /// Inserts or replaces a user's settings
    async fn save_notification_settings(
        &self,
        settings: &NotificationSettings,
    ) -> StoreResult<NotificationSettings>;
}
