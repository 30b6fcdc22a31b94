/// Allow-list of chat handles permitted to use the bot in whitelist mode
///
/// Handles are stored lower-cased and without the leading `@`, so lookups
/// are case-insensitive.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE allowed_users (
///     id BIGSERIAL PRIMARY KEY,
///     handle VARCHAR(255) NOT NULL UNIQUE,
///     role user_role NOT NULL DEFAULT 'employee',
///     added_by BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::user::Role;

/// Allow-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AllowedUser {
    pub id: i64,

    /// Normalized handle (lower-case, no `@`)
    pub handle: String,

    /// Role granted when the handle registers
    pub role: Role,

    /// Administrator who added the entry (None for seeded rows)
    pub added_by: Option<i64>,

    pub created_at: DateTime<Utc>,
}

/// Normalizes a handle for storage and comparison
///
/// ```
/// use taskbot_shared::models::allowed_user::normalize_handle;
///
/// assert_eq!(normalize_handle(" @Anna_K "), "anna_k");
/// ```
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

impl AllowedUser {
    /// Finds an entry by handle (case-insensitive, `@` optional)
    pub async fn find_by_handle(pool: &PgPool, handle: &str) -> Result<Option<Self>, sqlx::Error> {
        let entry = sqlx::query_as::<_, AllowedUser>(
            r#"
            SELECT id, handle, role, added_by, created_at
            FROM allowed_users
            WHERE handle = $1
            "#,
        )
        .bind(normalize_handle(handle))
        .fetch_optional(pool)
        .await?;

        Ok(entry)
    }

    /// Adds a handle to the allow-list, or changes the role of an existing entry
    pub async fn upsert(
        pool: &PgPool,
        handle: &str,
        role: Role,
        added_by: Option<i64>,
    ) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, AllowedUser>(
            r#"
            INSERT INTO allowed_users (handle, role, added_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (handle) DO UPDATE
            SET role = EXCLUDED.role
            RETURNING id, handle, role, added_by, created_at
            "#,
        )
        .bind(normalize_handle(handle))
        .bind(role)
        .bind(added_by)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }
}
