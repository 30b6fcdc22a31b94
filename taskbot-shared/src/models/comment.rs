/// Task comments
///
/// # Schema
///
/// ```sql
/// CREATE TABLE task_comments (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     body TEXT NOT NULL CHECK (body <> ''),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A comment left on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,

    /// Author
    pub user_id: i64,

    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub task_id: i64,
    pub user_id: i64,
    pub body: String,
    pub at: DateTime<Utc>,
}

impl Comment {
    pub async fn create(pool: &PgPool, data: NewComment) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO task_comments (task_id, user_id, body, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, task_id, user_id, body, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.body)
        .bind(data.at)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// The latest `limit` comments of a task, oldest first
    pub async fn list_for_task(
        pool: &PgPool,
        task_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, user_id, body, created_at
            FROM (
                SELECT id, task_id, user_id, body, created_at
                FROM task_comments
                WHERE task_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) latest
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(comments)
    }
}
