//! # Taskbot Worker Library
//!
//! Deadline scheduler: sends reminders for tasks close to or past their due
//! date, deduplicated through the notification log.
//!
//! ## Modules
//!
//! - `config`: worker configuration
//! - `reminders`: reminder kinds and message texts
//! - `scheduler`: the periodic pass

pub mod config;
pub mod reminders;
pub mod scheduler;
