/// Task model and database operations
///
/// Tasks are created by administrators and assigned to a registered user.
/// Any status may move to any other status; the only invariant is that
/// `completed_at` is set exactly when the status is `completed`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed', 'rejected');
///
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(255) NOT NULL CHECK (title <> ''),
///     description TEXT NOT NULL DEFAULT '',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'pending',
///     due_date TIMESTAMPTZ NOT NULL,
///     assignee_id BIGINT NOT NULL REFERENCES users(id),
///     creator_id BIGINT NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::{Duration, Utc};
/// use taskbot_shared::models::task::{NewTask, Task, TaskPriority, TaskStatus};
/// use taskbot_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/taskbot")).await?;
///
/// let task = Task::create(&pool, NewTask {
///     title: "Quarterly report".to_string(),
///     description: String::new(),
///     priority: TaskPriority::High,
///     due_date: Utc::now() + Duration::days(3),
///     assignee_id: 7,
///     creator_id: 1,
/// }).await?;
///
/// Task::update_status(&pool, task.id, TaskStatus::Completed, Utc::now()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Every priority, lowest first
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    /// Converts priority to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }

    /// Parses a priority word (case-insensitive)
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().to_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == word)
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet started
    Pending,

    /// Assignee is working on it
    InProgress,

    /// Done; `completed_at` is set
    Completed,

    /// Will not be done
    Rejected,
}

impl TaskStatus {
    /// Every status, in lifecycle order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Rejected,
    ];

    /// Converts status to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Rejected => "rejected",
        }
    }

    /// Parses a status word (case-insensitive)
    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().to_lowercase();
        Self::ALL.into_iter().find(|s| s.as_str() == word)
    }

    /// Checks if the task no longer needs attention
    ///
    /// Closed tasks are skipped by the deadline scheduler.
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Rejected)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Positive identifier assigned by the store
    pub id: i64,

    /// Short title (non-empty)
    pub title: String,

    /// Free-form description (may be empty)
    pub description: String,

    pub priority: TaskPriority,

    pub status: TaskStatus,

    /// Deadline
    pub due_date: DateTime<Utc>,

    /// User responsible for the task
    pub assignee_id: i64,

    /// Administrator who created the task
    pub creator_id: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set only while status is `completed`
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a task
///
/// Status always starts as `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub due_date: DateTime<Utc>,
    pub assignee_id: i64,
    pub creator_id: i64,
}

/// Filter for task listings
///
/// All fields are optional and combined with AND. Creation bounds are
/// inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks assigned to this user
    pub assignee_id: Option<i64>,

    /// Only tasks in this status
    pub status: Option<TaskStatus>,

    /// Only tasks created at or after this instant
    pub created_from: Option<DateTime<Utc>>,

    /// Only tasks created at or before this instant
    pub created_to: Option<DateTime<Utc>>,
}

impl TaskFilter {
    /// Filter for the tasks assigned to one user
    pub fn assigned_to(assignee_id: i64) -> Self {
        TaskFilter {
            assignee_id: Some(assignee_id),
            ..Default::default()
        }
    }

    /// Checks a task against the filter in memory
    pub fn matches(&self, task: &Task) -> bool {
        self.assignee_id.map_or(true, |id| task.assignee_id == id)
            && self.status.map_or(true, |status| task.status == status)
            && self.created_from.map_or(true, |from| task.created_at >= from)
            && self.created_to.map_or(true, |to| task.created_at <= to)
    }
}

impl Task {
    /// Checks if the given user is the assignee
    pub fn is_assigned_to(&self, user_id: i64) -> bool {
        self.assignee_id == user_id
    }

    /// Creates a new task in pending state
    ///
    /// # Errors
    ///
    /// Returns an error if a foreign key is violated or the database fails
    pub async fn create(pool: &PgPool, data: NewTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, priority, due_date, assignee_id, creator_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, title, description, priority, status, due_date,
                      assignee_id, creator_id, created_at, updated_at, completed_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.assignee_id)
        .bind(data.creator_id)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, priority, status, due_date,
                   assignee_id, creator_id, created_at, updated_at, completed_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks matching a filter, newest first
    pub async fn list(pool: &PgPool, filter: &TaskFilter) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, priority, status, due_date,
                   assignee_id, creator_id, created_at, updated_at, completed_at
            FROM tasks
            WHERE ($1::BIGINT IS NULL OR assignee_id = $1)
              AND ($2::task_status IS NULL OR status = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR created_at <= $4)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.assignee_id)
        .bind(filter.status)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Sets the status of a task
    ///
    /// Moving into `completed` stamps `completed_at` (keeping an existing
    /// stamp); any other status clears it.
    ///
    /// # Returns
    ///
    /// The updated task, or None if no task has that ID
    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: TaskStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2::task_status,
                completed_at = CASE
                    WHEN $2::task_status = 'completed' THEN COALESCE(completed_at, $3)
                    ELSE NULL
                END,
                updated_at = $3
            WHERE id = $1
            RETURNING id, title, description, priority, status, due_date,
                      assignee_id, creator_id, created_at, updated_at, completed_at
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(at)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists open tasks whose due date falls inside `[from, to]`
    ///
    /// Used by the deadline scheduler; ordered by due date so the most
    /// urgent reminders go out first.
    pub async fn open_due_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, title, description, priority, status, due_date,
                   assignee_id, creator_id, created_at, updated_at, completed_at
            FROM tasks
            WHERE status NOT IN ('completed', 'rejected')
              AND due_date BETWEEN $1 AND $2
            ORDER BY due_date ASC, id ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }
}
