/// HTTP route handlers
///
/// - `health`: health check endpoint
/// - `webhook`: Telegram update receiver

pub mod health;
pub mod webhook;
