/// Database models for Taskbot
///
/// Each model owns its row type and the queries that read and write it.
///
/// # Models
///
/// - `user`: registered chat users and their roles
/// - `allowed_user`: handles permitted in whitelist mode
/// - `task`: tasks with priority, status and deadline
/// - `notification`: one-shot deadline notifications already sent
/// - `history`: append-only log of task changes
/// - `comment`: comments left on tasks
/// - `settings`: per-user notification switches and quiet hours
///
/// # Example
///
/// ```no_run
/// use taskbot_shared::models::task::{Task, TaskFilter};
/// use taskbot_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/taskbot")).await?;
/// let mine = Task::list(&pool, &TaskFilter::assigned_to(7)).await?;
/// # Ok(())
/// # }
/// ```

pub mod allowed_user;
pub mod comment;
pub mod history;
pub mod notification;
pub mod settings;
pub mod task;
pub mod user;
