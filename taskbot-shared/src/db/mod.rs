/// Database layer for Taskbot
///
/// - `pool`: PostgreSQL connection pool with health check
/// - `migrations`: embedded schema migrations
///
/// Row types and their queries live in `crate::models`; the `crate::store`
/// module puts them behind the `Store` trait.

pub mod migrations;
pub mod pool;
