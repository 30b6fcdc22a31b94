/// Outbound chat transport
///
/// The dispatcher and the scheduler only need to send a message (optionally
/// with one inline button) and acknowledge a button press. The
/// [`ChatTransport`] trait covers exactly that.
///
/// - `telegram`: [`TelegramClient`], the Bot API over HTTPS
/// - `mock`: [`MockTransport`], records messages and can simulate failures
///
/// Delivery failures are returned as [`DeliveryError`]; callers log them and
/// carry on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod mock;
pub mod telegram;

pub use mock::MockTransport;
pub use telegram::{TelegramClient, TelegramConfig};

/// Error type for message delivery
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Network failure before a response arrived
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not finish within the client timeout
    #[error("Request timed out")]
    Timeout,

    /// The API answered with a non-success status or `ok: false`
    #[error("Rejected by chat API (status {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Inline button attached below a message
///
/// Pressing it sends `callback_data` back to the bot as a callback query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }

    /// Button that opens the detail view of a task
    pub fn open_task(task_id: i64) -> Self {
        Self::new(
            format!("Open task #{}", task_id),
            format!("/task_details {}", task_id),
        )
    }
}

/// Message ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Destination chat (the user's external ID for private chats)
    pub chat_id: String,

    /// HTML-formatted text
    pub text: String,

    pub button: Option<InlineButton>,
}

impl OutgoingMessage {
    pub fn new(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            button: None,
        }
    }

    pub fn with_button(mut self, button: InlineButton) -> Self {
        self.button = Some(button);
        self
    }
}

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a message
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), DeliveryError>;

    /// Acknowledges a callback query so the client stops its spinner
    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError>;
}
