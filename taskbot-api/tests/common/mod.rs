//! Common test utilities for integration tests
//!
//! Builds the full application on the in-memory store and the recording
//! transport, so no database or network is needed.

#![allow(dead_code)]

use std::sync::Arc;
use taskbot_api::app::{build_router, AppState};
use taskbot_api::config::BotConfig;
use taskbot_api::dispatcher::{Dispatch, IncomingMessage};
use taskbot_shared::auth::{AccessMode, SenderProfile};
use taskbot_shared::models::user::{NewUser, Role, User};
use taskbot_shared::store::{MemoryStore, Store};
use taskbot_shared::transport::MockTransport;

pub const SECRET: &str = "s3cret";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub transport: MockTransport,
    pub state: AppState,
    pub app: axum::Router,
}

impl TestContext {
    /// Open access mode, webhook secret set
    pub fn new() -> Self {
        Self::with_config(BotConfig::default())
    }

    pub fn whitelist() -> Self {
        Self::with_config(BotConfig {
            access_mode: AccessMode::Whitelist,
            ..BotConfig::default()
        })
    }

    pub fn with_config(bot: BotConfig) -> Self {
        let store = MemoryStore::new();
        let transport = MockTransport::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(transport.clone()),
            &bot,
            Some(SECRET.to_string()),
        );
        let app = build_router(state.clone());

        Self {
            store,
            transport,
            state,
            app,
        }
    }

    /// Registers a user directly in the store
    pub async fn user(&self, external_id: &str, handle: &str, role: Role) -> User {
        self.store
            .register_user(NewUser {
                external_id: external_id.to_string(),
                first_name: Some(handle.to_string()),
                last_name: None,
                handle: Some(handle.to_string()),
                role,
            })
            .await
            .unwrap()
    }

    /// Dispatches `text` as sent by `user` in their private chat
    pub async fn send(&self, user: &User, text: &str) -> Dispatch {
        self.state.dispatcher.dispatch(&message_from(user, text)).await
    }

    /// Dispatches `text` from an arbitrary sender profile
    pub async fn send_as(&self, sender: SenderProfile, text: &str) -> Dispatch {
        let message = IncomingMessage {
            chat_id: sender.external_id.clone(),
            sender,
            text: text.to_string(),
        };
        self.state.dispatcher.dispatch(&message).await
    }
}

pub fn profile(user: &User) -> SenderProfile {
    SenderProfile {
        external_id: user.external_id.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        handle: user.handle.clone(),
    }
}

pub fn message_from(user: &User, text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: user.external_id.clone(),
        sender: profile(user),
        text: text.to_string(),
    }
}
