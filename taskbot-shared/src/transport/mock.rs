/// Recording transport for tests
///
/// Stores every message instead of sending it. Individual chats can be made
/// to fail, which is how tests exercise delivery-error handling.
///
/// # Example
///
/// ```
/// use taskbot_shared::transport::{ChatTransport, MockTransport, OutgoingMessage};
///
/// # async fn example() {
/// let transport = MockTransport::new();
/// transport.fail_for("13");
///
/// assert!(transport.send_message(&OutgoingMessage::new("13", "hi")).await.is_err());
/// assert!(transport.send_message(&OutgoingMessage::new("7", "hi")).await.is_ok());
/// assert_eq!(transport.sent().len(), 1);
/// # }
/// ```

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ChatTransport, DeliveryError, OutgoingMessage};

#[derive(Debug, Default)]
struct MockState {
    sent: Vec<OutgoingMessage>,
    answered: Vec<String>,
    failing: HashSet<String>,
}

/// Transport that records messages in memory
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates a transport with nothing recorded
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // Poisoning is ignored so recorded messages stay readable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes sends to this chat fail
    pub fn fail_for(&self, chat_id: &str) {
        self.state().failing.insert(chat_id.to_string());
    }

    /// Lets sends to this chat succeed again
    pub fn recover(&self, chat_id: &str) {
        self.state().failing.remove(chat_id);
    }

    /// Every successfully sent message, oldest first
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.state().sent.clone()
    }

    /// Messages sent to one chat
    pub fn sent_to(&self, chat_id: &str) -> Vec<OutgoingMessage> {
        self.state()
            .sent
            .iter()
            .filter(|message| message.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// The most recent message, if any
    pub fn last(&self) -> Option<OutgoingMessage> {
        self.state().sent.last().cloned()
    }

    /// Acknowledged callback query IDs
    pub fn answered_callbacks(&self) -> Vec<String> {
        self.state().answered.clone()
    }

    /// Forgets recorded messages and callbacks
    pub fn clear(&self) {
        let mut state = self.state();
        state.sent.clear();
        state.answered.clear();
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        let mut state = self.state();
        if state.failing.contains(&message.chat_id) {
            return Err(DeliveryError::Rejected {
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        state.sent.push(message.clone());
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError> {
        self.state().answered.push(callback_id.to_string());
        Ok(())
    }
}
