/// Telegram webhook endpoint
///
/// # Endpoint
///
/// ```text
/// POST /webhooks/telegram
/// X-Telegram-Bot-Api-Secret-Token: <WEBHOOK_SECRET>
/// ```
///
/// Accepts one Bot API `Update`. Text messages and button presses whose
/// callback data is a command are dispatched; every other update kind is
/// acknowledged and ignored. Processed updates always answer `200 {"ok":true}`
/// so Telegram does not redeliver them; the outcome reaches the user as a
/// chat reply.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use taskbot_shared::auth::SenderProfile;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::{
    app::AppState,
    dispatcher::IncomingMessage,
    error::{ApiError, ApiResult},
};

/// Header carrying the secret configured with `setWebhook`
pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Subset of the Bot API `Update` object
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,

    #[serde(default)]
    pub message: Option<Message>,

    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,

    #[serde(default)]
    pub from: Option<TelegramUser>,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TelegramUser,

    #[serde(default)]
    pub message: Option<Message>,

    #[serde(default)]
    pub data: Option<String>,
}

/// Webhook acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub ok: bool,
}

impl From<&TelegramUser> for SenderProfile {
    fn from(user: &TelegramUser) -> Self {
        SenderProfile {
            external_id: user.id.to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            handle: user.username.clone(),
        }
    }
}

impl Update {
    /// The dispatchable message carried by this update, if any
    ///
    /// Also returns the callback query ID when the message came from a
    /// button press.
    pub fn incoming(&self) -> Option<(IncomingMessage, Option<String>)> {
        if let Some(message) = &self.message {
            let from = message.from.as_ref()?;
            let text = message.text.as_deref()?;
            return Some((
                IncomingMessage {
                    chat_id: message.chat.id.to_string(),
                    sender: from.into(),
                    text: text.to_string(),
                },
                None,
            ));
        }

        let callback = self.callback_query.as_ref()?;
        let data = callback.data.as_deref().filter(|data| data.starts_with('/'))?;
        let chat_id = callback
            .message
            .as_ref()
            .map(|message| message.chat.id)
            .unwrap_or(callback.from.id);

        Some((
            IncomingMessage {
                chat_id: chat_id.to_string(),
                sender: (&callback.from).into(),
                text: data.to_string(),
            },
            Some(callback.id.clone()),
        ))
    }
}

/// Rejects requests without the configured secret
///
/// Passes everything through when no secret is configured.
pub async fn require_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.webhook_secret.as_deref() {
        let provided = req
            .headers()
            .get(SECRET_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected) {
            tracing::warn!("Webhook call with missing or wrong secret");
            return Err(ApiError::Unauthorized("Invalid webhook secret".to_string()));
        }
    }

    Ok(next.run(req).await)
}

/// Receives one update
pub async fn telegram_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Update>, JsonRejection>,
) -> ApiResult<Json<WebhookResponse>> {
    let Json(update) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let span = info_span!(
        "update",
        update_id = update.update_id,
        correlation_id = %Uuid::new_v4()
    );

    async move {
        let Some((message, callback_id)) = update.incoming() else {
            debug!("Ignoring update without a dispatchable message");
            return;
        };

        if let Some(callback_id) = callback_id {
            state.responder.acknowledge(&callback_id).await;
        }

        let dispatch = state.dispatcher.dispatch(&message).await;
        let delivered = state.responder.deliver(&message.chat_id, dispatch).await;
        debug!(sender = %message.sender.external_id, delivered, "Update handled");
    }
    .instrument(span)
    .await;

    Ok(Json(WebhookResponse { ok: true }))
}
