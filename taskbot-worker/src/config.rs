/// Configuration for the deadline worker
///
/// # Environment Variables
///
/// In addition to the shared variables (`DATABASE_URL`,
/// `TELEGRAM_BOT_TOKEN`, ...):
///
/// - `SCHEDULER_INTERVAL_SECS`: seconds between passes (default: 300,
///   clamped to 60..=1800)
/// - `OVERDUE_LOOKBACK_HOURS`: how far past the deadline a task still gets
///   its overdue alert (default: 24)

use serde::Deserialize;
use std::time::Duration;
use taskbot_shared::config::{env_source, CommonSettings};

/// Shortest allowed interval between passes (1 minute)
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Longest allowed interval between passes (30 minutes)
pub const MAX_INTERVAL: Duration = Duration::from_secs(1800);

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub common: CommonSettings,
    pub scheduler: SchedulerConfig,
}

/// Deadline scheduler settings
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(rename = "scheduler_interval_secs")]
    pub interval_secs: u64,

    pub overdue_lookback_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            overdue_lookback_hours: 24,
        }
    }
}

impl SchedulerConfig {
    /// Pass interval, clamped to [`MIN_INTERVAL`]..=[`MAX_INTERVAL`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs).clamp(MIN_INTERVAL, MAX_INTERVAL)
    }

    /// How far back overdue tasks are still picked up
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.overdue_lookback_hours.max(0))
    }
}

const WORKER_DEFAULTS: &[(&str, &str)] = &[
    ("scheduler_interval_secs", "300"),
    ("overdue_lookback_hours", "24"),
];

impl Config {
    /// Loads configuration from the environment (and `.env` if present)
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let source = env_source(WORKER_DEFAULTS)?;

        let common = CommonSettings::from_source(&source)?;
        let scheduler: SchedulerConfig = source.try_deserialize()?;

        Ok(Self { common, scheduler })
    }
}
