/// Environment configuration shared by the API server and the worker
///
/// Settings come from environment variables (after loading `.env` when
/// present) through the `config` crate. Each binary deserializes its own
/// settings struct from the same source; [`CommonSettings`] holds the part
/// both need.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `TELEGRAM_BOT_TOKEN`: Bot API token (required)
/// - `TELEGRAM_API_BASE`: Bot API base URL (default: https://api.telegram.org)
/// - `TELEGRAM_REQUEST_TIMEOUT_SECS`: outbound request timeout (default: 10)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
///
/// # Example
///
/// ```no_run
/// use taskbot_shared::config::{env_source, CommonSettings};
///
/// # fn example() -> Result<(), config::ConfigError> {
/// let source = env_source(&[])?;
/// let common: CommonSettings = source.try_deserialize()?;
/// println!("pool size {}", common.database_max_connections);
/// # Ok(())
/// # }
/// ```

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::db::pool::DatabaseConfig;
use crate::transport::TelegramConfig;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,

    /// One JSON object per event
    Json,
}

/// Settings used by both binaries
#[derive(Debug, Clone, Deserialize)]
pub struct CommonSettings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub telegram_bot_token: String,
    pub telegram_api_base: String,
    pub telegram_request_timeout_secs: u64,
    pub log_format: LogFormat,
}

/// Defaults for the keys every binary reads
const COMMON_DEFAULTS: &[(&str, &str)] = &[
    ("database_max_connections", "10"),
    ("telegram_api_base", "https://api.telegram.org"),
    ("telegram_request_timeout_secs", "10"),
    ("log_format", "pretty"),
];

/// Builds the configuration source: defaults, then `.env`, then the process
/// environment
///
/// `extra_defaults` adds binary-specific defaults (keys are lower-case
/// variable names).
///
/// # Errors
///
/// Returns an error if a default cannot be registered or the source fails
/// to build
pub fn env_source(extra_defaults: &[(&str, &str)]) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();
    for (key, value) in COMMON_DEFAULTS.iter().chain(extra_defaults) {
        builder = builder.set_default(*key, *value)?;
    }

    builder.add_source(Environment::default()).build()
}

impl CommonSettings {
    /// Reads the shared settings from a built source
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed
    pub fn from_source(source: &Config) -> Result<Self, ConfigError> {
        let settings: Self = source.clone().try_deserialize()?;

        if settings.database_url.trim().is_empty() {
            return Err(ConfigError::Message("DATABASE_URL must not be empty".to_string()));
        }
        if settings.telegram_bot_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_BOT_TOKEN must not be empty".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            ..Default::default()
        }
    }

    pub fn telegram(&self) -> TelegramConfig {
        TelegramConfig {
            bot_token: self.telegram_bot_token.clone(),
            api_base: self.telegram_api_base.clone(),
            request_timeout_secs: self.telegram_request_timeout_secs,
        }
    }
}

/// Treats an empty string as unset
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> Config {
        let mut builder = Config::builder();
        for (key, value) in COMMON_DEFAULTS.iter().chain(pairs) {
            builder = builder.set_default(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let settings = CommonSettings::from_source(&source(&[
            ("database_url", "postgresql://localhost/taskbot"),
            ("telegram_bot_token", "123:abc"),
        ]))
        .unwrap();

        assert_eq!(settings.database_max_connections, 10);
        assert_eq!(settings.telegram_request_timeout_secs, 10);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.database().max_connections, 10);
        assert_eq!(settings.telegram().api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_missing_required_value() {
        assert!(CommonSettings::from_source(&source(&[("telegram_bot_token", "1:a")])).is_err());
        assert!(CommonSettings::from_source(&source(&[
            ("database_url", "postgresql://localhost/taskbot"),
            ("telegram_bot_token", " "),
        ]))
        .is_err());
    }

    #[test]
    fn test_json_log_format() {
        let settings = CommonSettings::from_source(&source(&[
            ("database_url", "postgresql://localhost/taskbot"),
            ("telegram_bot_token", "123:abc"),
            ("log_format", "json"),
        ]))
        .unwrap();
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("s".to_string())), Some("s".to_string()));
    }
}
