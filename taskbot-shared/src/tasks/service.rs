/// Task operations
///
/// Every command that reads or changes tasks or users ends up here. Checks
/// run in a fixed order: argument validation, lookup (not found), then
/// authorization (forbidden), then the write.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskbot_shared::store::MemoryStore;
/// use taskbot_shared::tasks::TaskService;
///
/// let service = TaskService::new(Arc::new(MemoryStore::new()));
/// ```

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::{TaskOpError, TaskOpResult};
use crate::auth::{require_admin, require_task_access};
use crate::commands::{
    extract_mentions, AllowUserArgs, CommentArgs, CreateTaskArgs, ListArgs, ParseError,
    SetRoleArgs, SettingsArgs, UpdateStatusArgs,
};
use crate::models::allowed_user::AllowedUser;
use crate::models::comment::{Comment, NewComment};
use crate::models::history::{HistoryEntry, NewHistoryEntry};
use crate::models::settings::{NotificationSetting, NotificationSettings};
use crate::models::task::{NewTask, Task, TaskFilter, TaskStatus};
use crate::models::user::User;
use crate::store::Store;

/// Entries shown by `/history`
pub const HISTORY_LIMIT: i64 = 20;

/// Comments shown by `/comments`
pub const COMMENTS_LIMIT: i64 = 20;

/// Characters of a comment kept in its history entry
const HISTORY_PREVIEW_CHARS: usize = 100;

/// A freshly created task and the user it was assigned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub task: Task,
    pub assignee: User,
}

/// A task with the people involved, for detail views
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    pub task: Task,
    pub assignee: Option<User>,
    pub creator: Option<User>,
}

/// Outcome of a status update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub task: Task,
    pub previous: TaskStatus,
}

impl StatusChange {
    /// False when the task already had the requested status
    pub fn changed(&self) -> bool {
        self.previous != self.task.status
    }
}

/// A history entry with the user who made the change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLine {
    pub entry: HistoryEntry,
    pub author: Option<User>,
}

/// Recent history of one task, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHistory {
    pub task: Task,
    pub lines: Vec<HistoryLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentLine {
    pub comment: Comment,
    pub author: Option<User>,
}

/// Recent comments of one task, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskComments {
    pub task: Task,
    pub lines: Vec<CommentLine>,
}

/// A stored comment and who should hear about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub task: Task,
    pub comment: Comment,

    /// Mentioned users other than the author who accept comment
    /// notifications right now
    pub notify: Vec<User>,
}

/// Task and user operations over a [`Store`]
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Creates a task (administrators only)
    ///
    /// Without an explicit assignee the task goes to its creator.
    ///
    /// # Errors
    ///
    /// - `Validation(InvalidAssignee)` if the assignee is not a number
    /// - `AssigneeNotFound` if no user has that external ID
    pub async fn create_task(&self, creator: &User, args: CreateTaskArgs) -> TaskOpResult<CreatedTask> {
        require_admin(creator)?;

        let assignee = match args.assignee.as_deref() {
            None => creator.clone(),
            Some(raw) => {
                let raw = raw.trim();
                if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ParseError::InvalidAssignee(raw.to_string()).into());
                }
                self.store
                    .find_user_by_external_id(raw)
                    .await?
                    .ok_or_else(|| TaskOpError::AssigneeNotFound(raw.to_string()))?
            }
        };

        let task = self
            .store
            .create_task(NewTask {
                title: args.title,
                description: args.description,
                priority: args.priority,
                due_date: args.due_date,
                assignee_id: assignee.id,
                creator_id: creator.id,
            })
            .await?;

        info!(
            task_id = task.id,
            creator_id = creator.id,
            assignee_id = assignee.id,
            priority = %task.priority,
            "Task created"
        );
        self.log_history(NewHistoryEntry::created(task.id, creator.id, &task.title, task.created_at))
            .await;

        Ok(CreatedTask { task, assignee })
    }

    /// Tasks assigned to the caller, newest first
    pub async fn list_my_tasks(&self, user: &User, status: Option<TaskStatus>) -> TaskOpResult<Vec<Task>> {
        let filter = TaskFilter {
            status,
            ..TaskFilter::assigned_to(user.id)
        };
        Ok(self.store.list_tasks(&filter).await?)
    }

    /// Every task, optionally filtered (administrators only)
    pub async fn list_all_tasks(&self, user: &User, args: &ListArgs) -> TaskOpResult<Vec<Task>> {
        require_admin(user)?;

        let filter = TaskFilter {
            assignee_id: None,
            status: args.status,
            created_from: args.created_from,
            created_to: args.created_to,
        };
        Ok(self.store.list_tasks(&filter).await?)
    }

    /// Loads a task the caller may see
    async fn accessible_task(&self, user: &User, task_id: Option<i64>) -> TaskOpResult<Task> {
        let task_id = task_id.ok_or(TaskOpError::TaskNotFound)?;
        let task = self
            .store
            .find_task(task_id)
            .await?
            .ok_or(TaskOpError::TaskNotFound)?;

        require_task_access(user, &task)?;
        Ok(task)
    }

    /// Full task view for an administrator or the assignee
    pub async fn task_details(&self, user: &User, task_id: Option<i64>) -> TaskOpResult<TaskDetails> {
        let task = self.accessible_task(user, task_id).await?;

        let assignee = self.store.find_user(task.assignee_id).await?;
        let creator = if task.creator_id == task.assignee_id {
            assignee.clone()
        } else {
            self.store.find_user(task.creator_id).await?
        };

        Ok(TaskDetails {
            task,
            assignee,
            creator,
        })
    }

    /// Moves a task to a new status
    ///
    /// Requesting the current status writes nothing and reports the task
    /// unchanged.
    pub async fn update_status(
        &self,
        user: &User,
        args: UpdateStatusArgs,
        now: DateTime<Utc>,
    ) -> TaskOpResult<StatusChange> {
        let task = self.accessible_task(user, args.task_id).await?;
        let previous = task.status;

        if previous == args.status {
            debug!(task_id = task.id, status = %previous, "Status unchanged");
            return Ok(StatusChange { task, previous });
        }

        let task = self
            .store
            .update_task_status(task.id, args.status, now)
            .await?
            .ok_or(TaskOpError::TaskNotFound)?;

        info!(
            task_id = task.id,
            user_id = user.id,
            from = %previous,
            to = %task.status,
            "Task status updated"
        );
        self.log_history(NewHistoryEntry::status(task.id, user.id, previous, task.status, now))
            .await;

        Ok(StatusChange { task, previous })
    }

    /// Changes another user's role (administrators only)
    ///
    /// When the target's handle is on the allow-list, the entry is updated
    /// too so whitelist mode does not revert the change.
    pub async fn change_role(&self, admin: &User, args: SetRoleArgs) -> TaskOpResult<User> {
        require_admin(admin)?;

        let target = self
            .store
            .find_user_by_external_id(&args.external_id)
            .await?
            .ok_or_else(|| TaskOpError::UserNotFound(args.external_id.clone()))?;

        let updated = self
            .store
            .set_user_role(target.id, args.role)
            .await?
            .ok_or_else(|| TaskOpError::UserNotFound(args.external_id.clone()))?;

        if let Some(handle) = updated.handle.as_deref() {
            if self.store.find_allowed_user(handle).await?.is_some() {
                self.store.allow_user(handle, args.role, Some(admin.id)).await?;
            }
        }

        info!(
            admin_id = admin.id,
            user_id = updated.id,
            role = %updated.role,
            "User role changed"
        );

        Ok(updated)
    }

    /// Adds a handle to the allow-list (administrators only)
    pub async fn allow_user(&self, admin: &User, args: AllowUserArgs) -> TaskOpResult<AllowedUser> {
        require_admin(admin)?;

        let entry = self
            .store
            .allow_user(&args.handle, args.role, Some(admin.id))
            .await?;

        info!(admin_id = admin.id, handle = %entry.handle, role = %entry.role, "Handle allowed");
        Ok(entry)
    }

    /// Recent changes of a task the caller may see
    pub async fn task_history(&self, user: &User, task_id: Option<i64>) -> TaskOpResult<TaskHistory> {
        let task = self.accessible_task(user, task_id).await?;
        let entries = self.store.task_history(task.id, HISTORY_LIMIT).await?;

        let authors = self.users_by_id(entries.iter().map(|entry| entry.user_id)).await?;
        let lines = entries
            .into_iter()
            .map(|entry| HistoryLine {
                author: authors.get(&entry.user_id).cloned().flatten(),
                entry,
            })
            .collect();

        Ok(TaskHistory { task, lines })
    }

    /// Recent comments of a task the caller may see
    pub async fn list_comments(&self, user: &User, task_id: Option<i64>) -> TaskOpResult<TaskComments> {
        let task = self.accessible_task(user, task_id).await?;
        let comments = self.store.list_comments(task.id, COMMENTS_LIMIT).await?;

        let authors = self.users_by_id(comments.iter().map(|comment| comment.user_id)).await?;
        let lines = comments
            .into_iter()
            .map(|comment| CommentLine {
                author: authors.get(&comment.user_id).cloned().flatten(),
                comment,
            })
            .collect();

        Ok(TaskComments { task, lines })
    }

    /// Adds a comment to a task the caller may see
    ///
    /// `@handle` mentions are resolved to registered users; unknown handles
    /// are ignored.
    pub async fn add_comment(
        &self,
        user: &User,
        args: CommentArgs,
        now: DateTime<Utc>,
    ) -> TaskOpResult<PostedComment> {
        let task = self.accessible_task(user, args.task_id).await?;

        let comment = self
            .store
            .add_comment(NewComment {
                task_id: task.id,
                user_id: user.id,
                body: args.body,
                at: now,
            })
            .await?;

        info!(task_id = task.id, user_id = user.id, comment_id = comment.id, "Comment added");
        let preview: String = comment.body.chars().take(HISTORY_PREVIEW_CHARS).collect();
        self.log_history(NewHistoryEntry::comment(task.id, user.id, &preview, now))
            .await;

        let mut notify = Vec::new();
        for handle in extract_mentions(&comment.body) {
            let Some(mentioned) = self.store.find_user_by_handle(&handle).await? else {
                debug!(task_id = task.id, handle = %handle, "Mentioned handle is not registered");
                continue;
            };
            if mentioned.id == user.id || notify.iter().any(|u: &User| u.id == mentioned.id) {
                continue;
            }

            let settings = self.store.notification_settings(mentioned.id).await?;
            if settings.accepts(NotificationSetting::Comments, now) {
                notify.push(mentioned);
            } else {
                debug!(task_id = task.id, user_id = mentioned.id, "Mention notification muted");
            }
        }

        Ok(PostedComment {
            task,
            comment,
            notify,
        })
    }

    /// The caller's notification settings
    pub async fn notification_settings(&self, user: &User) -> TaskOpResult<NotificationSettings> {
        Ok(self.store.notification_settings(user.id).await?)
    }

    /// Applies a `/settings` change and returns the resulting settings
    pub async fn update_settings(
        &self,
        user: &User,
        args: SettingsArgs,
        now: DateTime<Utc>,
    ) -> TaskOpResult<NotificationSettings> {
        let mut settings = self.store.notification_settings(user.id).await?;

        match args {
            SettingsArgs::Show => return Ok(settings),
            SettingsArgs::Toggle { setting, enabled } => {
                settings.set(setting, enabled);
                info!(user_id = user.id, setting = %setting, enabled, "Notification setting changed");
            }
            SettingsArgs::QuietHours(quiet) => {
                settings.set_quiet_hours(quiet);
                let window = quiet.map_or_else(|| "off".to_string(), |q| q.to_string());
                info!(user_id = user.id, quiet_hours = %window, "Quiet hours changed");
            }
        }

        settings.updated_at = now;
        Ok(self.store.save_notification_settings(&settings).await?)
    }

    /// Loads each distinct user once; missing users map to None
    async fn users_by_id(
        &self,
        ids: impl Iterator<Item = i64>,
    ) -> TaskOpResult<HashMap<i64, Option<User>>> {
        let mut users = HashMap::new();
        for id in ids {
            if !users.contains_key(&id) {
                let user = self.store.find_user(id).await?;
                users.insert(id, user);
            }
        }
        Ok(users)
    }

    /// Appends a history entry; a failed write is logged and does not undo
    /// the change it describes
    async fn log_history(&self, entry: NewHistoryEntry) {
        let (task_id, change) = (entry.task_id, entry.change_type);
        if let Err(e) = self.store.record_history(entry).await {
            warn!(task_id, change = %change, error = %e, "Failed to record task history");
        }
    }
}
