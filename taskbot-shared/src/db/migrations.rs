/// Schema migrations
///
/// The SQL files under `taskbot-shared/migrations/` are embedded into both
/// binaries. Only the API server applies them at startup; the worker calls
/// [`migration_status`] and warns when it runs against an older schema.
///
/// # Example
///
/// ```no_run
/// use taskbot_shared::db::migrations::{migration_status, run_migrations};
/// use taskbot_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/taskbot")).await?;
/// run_migrations(&pool).await?;
/// assert_eq!(migration_status(&pool).await?.pending, 0);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::postgres::PgPool;
use sqlx::Postgres;
use tracing::{info, warn};

/// Migrations embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Where the database schema stands relative to the embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: usize,
    pub latest_version: Option<i64>,

    /// Embedded migrations the database has not seen yet
    pub pending: usize,
}

impl MigrationStatus {
    pub fn is_current(&self) -> bool {
        self.pending == 0
    }
}

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails; sqlx rolls that migration back
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(embedded = MIGRATOR.iter().count(), "Applying schema migrations");

    if let Err(e) = MIGRATOR.run(pool).await {
        warn!(error = %e, "Migration failed");
        return Err(e);
    }

    info!("Schema is up to date");
    Ok(())
}

/// Compares `_sqlx_migrations` with the embedded migrations
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let applied: Vec<i64> = if table_exists {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .filter(|m| !applied.contains(&m.version))
        .count();

    Ok(MigrationStatus {
        applied: applied.len(),
        latest_version: applied.last().copied(),
        pending,
    })
}

/// Creates the database named in `database_url` if it is missing
///
/// Meant for local setups and the Postgres-backed tests.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}
