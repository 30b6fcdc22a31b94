//! # Taskbot Shared Library
//!
//! Types, persistence and business logic used by both the Taskbot API server
//! (webhook + command dispatcher) and the deadline worker.
//!
//! ## Module Organization
//!
//! - `models`: database rows and their queries
//! - `db`: connection pool and migrations
//! - `store`: the `Store` trait with PostgreSQL and in-memory implementations
//! - `auth`: sender resolution and permission checks
//! - `commands`: command aliases and argument parsing
//! - `tasks`: task operations
//! - `transport`: outbound chat messages
//! - `format`: HTML rendering helpers
//! - `config`: environment settings

pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod format;
pub mod models;
pub mod store;
pub mod tasks;
pub mod transport;

/// Current version of the Taskbot shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
