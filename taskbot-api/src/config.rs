/// Configuration for the API server
///
/// Loaded from environment variables through `taskbot_shared::config`.
///
/// # Environment Variables
///
/// In addition to the shared variables (`DATABASE_URL`,
/// `TELEGRAM_BOT_TOKEN`, ...):
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `WEBHOOK_SECRET`: expected `X-Telegram-Bot-Api-Secret-Token` (default: unset)
/// - `ACCESS_MODE`: `open` or `whitelist` (default: open)
/// - `SESSION_TTL_SECS`: idle lifetime of a create-task wizard (default: 600)
///
/// # Example
///
/// ```no_run
/// use taskbot_api::config::Config;
///
/// # fn example() -> Result<(), config::ConfigError> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;
use std::time::Duration;
use taskbot_shared::auth::AccessMode;
use taskbot_shared::config::{env_source, non_empty, CommonSettings};

/// Complete API server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings shared with the worker
    pub common: CommonSettings,

    /// HTTP server settings
    pub api: ApiConfig,

    /// Bot behaviour settings
    pub bot: BotConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(rename = "api_host")]
    pub host: String,

    #[serde(rename = "api_port")]
    pub port: u16,

    /// Secret the chat platform sends with every webhook call
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Bot behaviour configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Who may use the bot
    pub access_mode: AccessMode,

    /// Idle lifetime of a create-task wizard session, in seconds
    pub session_ttl_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            access_mode: AccessMode::Open,
            session_ttl_secs: 600,
        }
    }
}

impl BotConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

const API_DEFAULTS: &[(&str, &str)] = &[
    ("api_host", "0.0.0.0"),
    ("api_port", "8080"),
    ("access_mode", "open"),
    ("session_ttl_secs", "600"),
];

impl Config {
    /// Loads configuration from the environment (and `.env` if present)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot
    /// be parsed
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let source = env_source(API_DEFAULTS)?;

        let common = CommonSettings::from_source(&source)?;
        let mut api: ApiConfig = source.clone().try_deserialize()?;
        api.webhook_secret = non_empty(api.webhook_secret);
        let bot: BotConfig = source.try_deserialize()?;

        Ok(Self { common, api, bot })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_section_from_source() {
        let mut builder = config::Config::builder();
        for (key, value) in API_DEFAULTS {
            builder = builder.set_default(*key, *value).unwrap();
        }
        let source = builder
            .set_override("webhook_secret", "12345")
            .unwrap()
            .set_override("access_mode", "whitelist")
            .unwrap()
            .build()
            .unwrap();

        let api: ApiConfig = source.clone().try_deserialize().unwrap();
        assert_eq!(api.host, "0.0.0.0");
        assert_eq!(api.port, 8080);
        assert_eq!(api.webhook_secret.as_deref(), Some("12345"));

        let bot: BotConfig = source.try_deserialize().unwrap();
        assert_eq!(bot.access_mode, AccessMode::Whitelist);
        assert_eq!(bot.session_ttl(), Duration::from_secs(600));
    }
}
