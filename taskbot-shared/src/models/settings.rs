/// Per-user notification settings
///
/// Users without a row get [`NotificationSettings::defaults`]: every kind
/// enabled and no quiet hours. Quiet hours are wall-clock times in UTC and
/// may wrap past midnight (`22:00-08:00`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notification_settings (
///     user_id BIGINT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     remind_8h BOOLEAN NOT NULL DEFAULT TRUE,
///     remind_4h BOOLEAN NOT NULL DEFAULT TRUE,
///     remind_final_hour BOOLEAN NOT NULL DEFAULT TRUE,
///     overdue BOOLEAN NOT NULL DEFAULT TRUE,
///     comments BOOLEAN NOT NULL DEFAULT TRUE,
///     quiet_start TIME,
///     quiet_end TIME,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;

/// One switchable kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationSetting {
    #[serde(rename = "8h")]
    EightHours,

    #[serde(rename = "4h")]
    FourHours,

    /// Repeating reminder in the last hour before the deadline
    #[serde(rename = "1h")]
    FinalHour,

    #[serde(rename = "overdue")]
    Overdue,

    /// Mentions in task comments
    #[serde(rename = "comments")]
    Comments,
}

impl NotificationSetting {
    pub const ALL: [NotificationSetting; 5] = [
        NotificationSetting::EightHours,
        NotificationSetting::FourHours,
        NotificationSetting::FinalHour,
        NotificationSetting::Overdue,
        NotificationSetting::Comments,
    ];

    /// Word used in `/settings`
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationSetting::EightHours => "8h",
            NotificationSetting::FourHours => "4h",
            NotificationSetting::FinalHour => "1h",
            NotificationSetting::Overdue => "overdue",
            NotificationSetting::Comments => "comments",
        }
    }

    pub fn from_word(word: &str) -> Option<Self> {
        let word = word.trim().to_lowercase();
        Self::ALL.into_iter().find(|setting| setting.as_str() == word)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            NotificationSetting::EightHours => "8 hours before the deadline",
            NotificationSetting::FourHours => "4 hours before the deadline",
            NotificationSetting::FinalHour => "during the last hour",
            NotificationSetting::Overdue => "overdue tasks",
            NotificationSetting::Comments => "mentions in comments",
        }
    }
}

impl fmt::Display for NotificationSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A daily window during which notifications are held back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    /// Whether `time` falls inside `[start, end)`; an empty window
    /// (`start == end`) contains nothing
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

impl fmt::Display for QuietHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Notification preferences of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationSettings {
    pub user_id: i64,
    pub remind_8h: bool,
    pub remind_4h: bool,
    pub remind_final_hour: bool,
    pub overdue: bool,
    pub comments: bool,
    pub quiet_start: Option<NaiveTime>,
    pub quiet_end: Option<NaiveTime>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationSettings {
    /// Everything enabled, no quiet hours
    pub fn defaults(user_id: i64, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            remind_8h: true,
            remind_4h: true,
            remind_final_hour: true,
            overdue: true,
            comments: true,
            quiet_start: None,
            quiet_end: None,
            updated_at: at,
        }
    }

    pub fn enabled(&self, setting: NotificationSetting) -> bool {
        match setting {
            NotificationSetting::EightHours => self.remind_8h,
            NotificationSetting::FourHours => self.remind_4h,
            NotificationSetting::FinalHour => self.remind_final_hour,
            NotificationSetting::Overdue => self.overdue,
            NotificationSetting::Comments => self.comments,
        }
    }

    pub fn set(&mut self, setting: NotificationSetting, enabled: bool) {
        let flag = match setting {
            NotificationSetting::EightHours => &mut self.remind_8h,
            NotificationSetting::FourHours => &mut self.remind_4h,
            NotificationSetting::FinalHour => &mut self.remind_final_hour,
            NotificationSetting::Overdue => &mut self.overdue,
            NotificationSetting::Comments => &mut self.comments,
        };
        *flag = enabled;
    }

    pub fn quiet_hours(&self) -> Option<QuietHours> {
        match (self.quiet_start, self.quiet_end) {
            (Some(start), Some(end)) => Some(QuietHours { start, end }),
            _ => None,
        }
    }

    pub fn set_quiet_hours(&mut self, quiet: Option<QuietHours>) {
        self.quiet_start = quiet.map(|q| q.start);
        self.quiet_end = quiet.map(|q| q.end);
    }

    /// Whether `at` falls inside the user's quiet hours
    pub fn is_quiet_at(&self, at: DateTime<Utc>) -> bool {
        self.quiet_hours()
            .is_some_and(|quiet| quiet.contains(at.time()))
    }

    /// Whether a notification of this kind may be delivered at `at`
    pub fn accepts(&self, setting: NotificationSetting, at: DateTime<Utc>) -> bool {
        self.enabled(setting) && !self.is_quiet_at(at)
    }
}

impl NotificationSettings {
    pub async fn find(pool: &PgPool, user_id: i64) -> Result<Option<Self>, sqlx::Error> {
        let settings = sqlx::query_as::<_, NotificationSettings>(
            r#"
            SELECT user_id, remind_8h, remind_4h, remind_final_hour, overdue, comments,
                   quiet_start, quiet_end, updated_at
            FROM notification_settings
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(settings)
    }

    /// Inserts or replaces the row for `settings.user_id`
    pub async fn save(pool: &PgPool, settings: &NotificationSettings) -> Result<Self, sqlx::Error> {
        let saved = sqlx::query_as::<_, NotificationSettings>(
            r#"
            INSERT INTO notification_settings
                (user_id, remind_8h, remind_4h, remind_final_hour, overdue, comments,
                 quiet_start, quiet_end, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE
            SET remind_8h = EXCLUDED.remind_8h,
                remind_4h = EXCLUDED.remind_4h,
                remind_final_hour = EXCLUDED.remind_final_hour,
                overdue = EXCLUDED.overdue,
                comments = EXCLUDED.comments,
                quiet_start = EXCLUDED.quiet_start,
                quiet_end = EXCLUDED.quiet_end,
                updated_at = EXCLUDED.updated_at
            RETURNING user_id, remind_8h, remind_4h, remind_final_hour, overdue, comments,
                      quiet_start, quiet_end, updated_at
            "#,
        )
        .bind(settings.user_id)
        .bind(settings.remind_8h)
        .bind(settings.remind_4h)
        .bind(settings.remind_final_hour)
        .bind(settings.overdue)
        .bind(settings.comments)
        .bind(settings.quiet_start)
        .bind(settings.quiet_end)
        .bind(settings.updated_at)
        .fetch_one(pool)
        .await?;

        Ok(saved)
    }
}
