/// Outbound delivery of dispatcher results

use std::sync::Arc;
use taskbot_shared::transport::{ChatTransport, OutgoingMessage};
use tracing::{debug, warn};

use crate::dispatcher::Dispatch;

/// Sends replies and notifications through the chat transport
///
/// Delivery failures are logged and swallowed: a user who blocked the bot
/// must not break handling for anyone else.
#[derive(Clone)]
pub struct Responder {
    transport: Arc<dyn ChatTransport>,
}

impl Responder {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Sends the reply to `chat_id`, then each notification
    ///
    /// Returns the number of messages delivered.
    pub async fn deliver(&self, chat_id: &str, dispatch: Dispatch) -> usize {
        let mut reply = OutgoingMessage::new(chat_id, dispatch.reply.text);
        reply.button = dispatch.reply.button;

        let mut delivered = 0;
        for message in std::iter::once(reply).chain(dispatch.notifications) {
            match self.transport.send_message(&message).await {
                Ok(()) => {
                    debug!(chat_id = %message.chat_id, "Message delivered");
                    delivered += 1;
                }
                Err(e) => warn!(chat_id = %message.chat_id, error = %e, "Message delivery failed"),
            }
        }
        delivered
    }

    /// Stops the client-side spinner on a pressed button
    pub async fn acknowledge(&self, callback_id: &str) {
        if let Err(e) = self.transport.answer_callback(callback_id).await {
            warn!(callback_id = %callback_id, error = %e, "Failed to answer callback");
        }
    }
}
