/// User model and database operations
///
/// A user is created lazily the first time a chat sender registers (or, in
/// whitelist mode, the first time an allow-listed handle writes to the bot).
/// Users are never deleted; only their profile fields and role change.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'employee');
///
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     external_id VARCHAR(64) NOT NULL UNIQUE,
///     first_name VARCHAR(255),
///     last_name VARCHAR(255),
///     handle VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'employee',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskbot_shared::models::user::{NewUser, Role, User};
/// use taskbot_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/taskbot")).await?;
///
/// let user = User::register(&pool, NewUser {
///     external_id: "111".to_string(),
///     first_name: Some("Anna".to_string()),
///     last_name: None,
///     handle: Some("anna".to_string()),
///     role: Role::Employee,
/// }).await?;
///
/// let found = User::find_by_external_id(&pool, "111").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

/// Role of a user, controlling which commands they may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can create tasks, see every task and manage users
    Admin,

    /// Can see and update only the tasks assigned to them
    Employee,
}

impl Role {
    /// Every role, in display order
    pub const ALL: [Role; 2] = [Role::Admin, Role::Employee];

    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    /// Returns true for administrators
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            _ => Err(()),
        }
    }
}

/// A registered chat user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Internal identifier assigned by the store
    pub id: i64,

    /// Identifier issued by the chat platform (immutable)
    pub external_id: String,

    /// Optional first name from the chat profile
    pub first_name: Option<String>,

    /// Optional last name from the chat profile
    pub last_name: Option<String>,

    /// Optional handle (username without the leading `@`)
    pub handle: Option<String>,

    /// Permission role
    pub role: Role,

    /// When the user first registered
    pub created_at: DateTime<Utc>,

    /// When the profile or role last changed
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Human-readable name used in replies
    ///
    /// Prefers `@handle`, then the first/last name pair, then `User #id`.
    pub fn display_name(&self) -> String {
        if let Some(handle) = self.handle.as_deref().filter(|h| !h.is_empty()) {
            return format!("@{}", handle);
        }

        let full_name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if full_name.is_empty() {
            format!("User #{}", self.id)
        } else {
            full_name
        }
    }

    /// Returns true if the user holds the admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Input for registering a user
///
/// Registration is an upsert keyed on `external_id`: profile fields are
/// refreshed for an existing row, the role of an existing row is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Chat platform identifier
    pub external_id: String,

    /// Optional first name
    pub first_name: Option<String>,

    /// Optional last name
    pub last_name: Option<String>,

    /// Optional handle
    pub handle: Option<String>,

    /// Role used only when the row is created
    pub role: Role,
}

impl User {
    /// Registers a user or refreshes the profile of an existing one
    ///
    /// Concurrent first contacts from the same sender converge on a single
    /// row thanks to the `external_id` unique constraint.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn register(pool: &PgPool, data: NewUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, first_name, last_name, handle, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                handle = EXCLUDED.handle,
                updated_at = NOW()
            RETURNING id, external_id, first_name, last_name, handle, role,
                      created_at, updated_at
            "#,
        )
        .bind(data.external_id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.handle)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by internal ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, handle, role,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by the chat platform identifier
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, handle, role,
                   created_at, updated_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by handle, ignoring case and a leading `@`
    pub async fn find_by_handle(pool: &PgPool, handle: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, handle, role,
                   created_at, updated_at
            FROM users
            WHERE LOWER(handle) = LOWER($1)
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(handle.trim_start_matches('@'))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Changes a user's role
    ///
    /// # Returns
    ///
    /// The updated user, or None if no user has that ID
    pub async fn set_role(pool: &PgPool, id: i64, role: Role) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET role = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, external_id, first_name, last_name, handle, role,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists every administrator, oldest first
    pub async fn list_admins(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, handle, role,
                   created_at, updated_at
            FROM users
            WHERE role = 'admin'
            ORDER BY id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}
