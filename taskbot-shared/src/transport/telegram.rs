/// Telegram Bot API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatTransport, DeliveryError, InlineButton, OutgoingMessage};

/// Settings for the Bot API client
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Token issued by BotFather
    pub bot_token: String,

    /// API base URL, without trailing slash
    pub api_base: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup<'a> {
    inline_keyboard: [[&'a InlineButton; 1]; 1],
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup<'a>>,
}

impl<'a> SendMessageRequest<'a> {
    fn from_message(message: &'a OutgoingMessage) -> Self {
        Self {
            chat_id: &message.chat_id,
            text: &message.text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
            reply_markup: message.button.as_ref().map(|button| InlineKeyboardMarkup {
                inline_keyboard: [[button]],
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// HTTP client for the Bot API
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramClient {
    /// Builds a client with the configured timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised
    pub fn new(config: &TelegramConfig) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    async fn call<T: Serialize + Sync>(&self, method: &str, body: &T) -> Result<(), DeliveryError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let parsed: Option<ApiResponse> = response.json().await.ok();

        match parsed {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => {
                debug!(method, "Chat API call succeeded");
                Ok(())
            }
            other => {
                let description = other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string());
                warn!(method, status = status.as_u16(), %description, "Chat API call rejected");
                Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                    description,
                })
            }
        }
    }
}

/// Separates timeouts from other transport errors
fn classify(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout
    } else {
        // Strip the URL, it embeds the bot token.
        DeliveryError::Http(err.without_url())
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), DeliveryError> {
        self.call("sendMessage", &SendMessageRequest::from_message(message))
            .await
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), DeliveryError> {
        self.call(
            "answerCallbackQuery",
            &AnswerCallbackRequest {
                callback_query_id: callback_id,
            },
        )
        .await
    }
}
