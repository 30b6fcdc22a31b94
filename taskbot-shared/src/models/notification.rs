/// Log of one-shot deadline notifications
///
/// Each `(task_id, kind)` pair is recorded at most once, which is what keeps
/// the scheduler from repeating a reminder across passes or restarts.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_notifications (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     kind VARCHAR(16) NOT NULL,
///     sent_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (task_id, kind)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// Kind of a persisted one-shot notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Sent once when the task is within 8 hours of its deadline
    #[serde(rename = "8h")]
    EightHours,

    /// Sent once when the task is within 4 hours of its deadline
    #[serde(rename = "4h")]
    FourHours,

    /// Sent once after the deadline passed
    #[serde(rename = "overdue")]
    Overdue,
}

impl NotificationKind {
    /// Stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EightHours => "8h",
            NotificationKind::FourHours => "4h",
            NotificationKind::Overdue => "overdue",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted notification record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub task_id: i64,
    pub kind: NotificationKind,
    pub sent_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Checks whether a notification of this kind was already sent
    pub async fn exists(
        pool: &PgPool,
        task_id: i64,
        kind: NotificationKind,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM task_notifications
                WHERE task_id = $1 AND kind = $2
            )
            "#,
        )
        .bind(task_id)
        .bind(kind.as_str())
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Records a sent notification
    ///
    /// # Returns
    ///
    /// `true` if a new record was written, `false` if one already existed
    pub async fn record(
        pool: &PgPool,
        task_id: i64,
        kind: NotificationKind,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO task_notifications (task_id, kind, sent_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (task_id, kind) DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(kind.as_str())
        .bind(sent_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_storage_form() {
        assert_eq!(NotificationKind::EightHours.as_str(), "8h");
        assert_eq!(NotificationKind::FourHours.to_string(), "4h");
        assert_eq!(
            serde_json::to_string(&NotificationKind::Overdue).unwrap(),
            "\"overdue\""
        );
    }
}
