//! # Taskbot API Server Library
//!
//! Webhook receiver and command dispatcher for the Taskbot chat bot.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration management
//! - `dispatcher`: command routing, wizard sessions and reply texts
//! - `error`: HTTP error mapping
//! - `responder`: delivery of replies and notifications
//! - `routes`: HTTP route handlers

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod responder;
pub mod routes;
