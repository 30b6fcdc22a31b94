/// Task history
///
/// An append-only log of what happened to a task: creation, status changes
/// and comments. Entries are never edited.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_change AS ENUM ('created', 'status', 'comment');
///
/// CREATE TABLE task_history (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     change_type task_change NOT NULL,
///     old_value TEXT,
///     new_value TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// What a history entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_change", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HistoryChange {
    /// Task created; `new_value` holds the title
    Created,

    /// Status moved from `old_value` to `new_value`
    Status,

    /// Comment added; `new_value` holds the comment text
    Comment,
}

impl HistoryChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryChange::Created => "created",
            HistoryChange::Status => "status",
            HistoryChange::Comment => "comment",
        }
    }
}

impl fmt::Display for HistoryChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a task's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub task_id: i64,

    /// Who made the change
    pub user_id: i64,

    pub change_type: HistoryChange,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub task_id: i64,
    pub user_id: i64,
    pub change_type: HistoryChange,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub at: DateTime<Utc>,
}

impl NewHistoryEntry {
    pub fn created(task_id: i64, user_id: i64, title: &str, at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            user_id,
            change_type: HistoryChange::Created,
            old_value: None,
            new_value: Some(title.to_string()),
            at,
        }
    }

    pub fn status(
        task_id: i64,
        user_id: i64,
        from: impl fmt::Display,
        to: impl fmt::Display,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            user_id,
            change_type: HistoryChange::Status,
            old_value: Some(from.to_string()),
            new_value: Some(to.to_string()),
            at,
        }
    }

    pub fn comment(task_id: i64, user_id: i64, body: &str, at: DateTime<Utc>) -> Self {
        Self {
            task_id,
            user_id,
            change_type: HistoryChange::Comment,
            old_value: None,
            new_value: Some(body.to_string()),
            at,
        }
    }
}

impl HistoryEntry {
    /// Appends an entry
    ///
    /// # Errors
    ///
    /// Returns an error if the task or user does not exist
    pub async fn record(pool: &PgPool, data: NewHistoryEntry) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, HistoryEntry>(
            r#"
            INSERT INTO task_history (task_id, user_id, change_type, old_value, new_value, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, task_id, user_id, change_type, old_value, new_value, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.change_type)
        .bind(data.old_value)
        .bind(data.new_value)
        .bind(data.at)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }

    /// The latest `limit` entries of a task, newest first
    pub async fn list_for_task(
        pool: &PgPool,
        task_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT id, task_id, user_id, change_type, old_value, new_value, created_at
            FROM task_history
            WHERE task_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(entries)
    }
}
