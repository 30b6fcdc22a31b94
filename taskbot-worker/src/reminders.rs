/// Reminder kinds and their message texts

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use taskbot_shared::format::{escape_html, format_datetime, priority_label};
use taskbot_shared::models::notification::NotificationKind;
use taskbot_shared::models::settings::NotificationSetting;
use taskbot_shared::models::task::Task;
use taskbot_shared::models::user::User;

/// Reminder due for a task on one pass
///
/// Only the most urgent kind applies at any moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    /// 4 to 8 hours left; sent once
    EightHours,

    /// 1 to 4 hours left; sent once
    FourHours,

    /// Under an hour left; repeated on every pass
    FinalHour,

    /// Deadline passed; sent once to the assignee and every admin
    Overdue,
}

impl ReminderKind {
    /// Picks the reminder for a task due at `due`, or None when it is more
    /// than 8 hours away
    pub fn classify(due: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let remaining = due - now;

        if remaining <= Duration::zero() {
            Some(ReminderKind::Overdue)
        } else if remaining <= Duration::hours(1) {
            Some(ReminderKind::FinalHour)
        } else if remaining <= Duration::hours(4) {
            Some(ReminderKind::FourHours)
        } else if remaining <= Duration::hours(8) {
            Some(ReminderKind::EightHours)
        } else {
            None
        }
    }

    /// The persisted record for one-shot kinds; None for repeating ones
    pub fn record_kind(&self) -> Option<NotificationKind> {
        match self {
            ReminderKind::EightHours => Some(NotificationKind::EightHours),
            ReminderKind::FourHours => Some(NotificationKind::FourHours),
            ReminderKind::FinalHour => None,
            ReminderKind::Overdue => Some(NotificationKind::Overdue),
        }
    }

    /// The user setting that switches this kind on or off
    pub fn setting(&self) -> NotificationSetting {
        match self {
            ReminderKind::EightHours => NotificationSetting::EightHours,
            ReminderKind::FourHours => NotificationSetting::FourHours,
            ReminderKind::FinalHour => NotificationSetting::FinalHour,
            ReminderKind::Overdue => NotificationSetting::Overdue,
        }
    }

    pub fn notifies_admins(&self) -> bool {
        matches!(self, ReminderKind::Overdue)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderKind::EightHours => "8h",
            ReminderKind::FourHours => "4h",
            ReminderKind::FinalHour => "final_hour",
            ReminderKind::Overdue => "overdue",
        }
    }
}

impl fmt::Display for ReminderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn task_summary(task: &Task) -> String {
    let mut summary = format!(
        "{} <b>#{} {}</b>",
        priority_label(task.priority),
        task.id,
        escape_html(&task.title)
    );
    if !task.description.is_empty() {
        let preview: String = task.description.chars().take(100).collect();
        summary.push_str(&format!("\n📝 {}", escape_html(&preview)));
    }
    summary
}

/// Message for the assignee
pub fn assignee_text(kind: ReminderKind, task: &Task) -> String {
    let headline = match kind {
        ReminderKind::EightHours => "⏰ <b>Task reminder</b>: about 8 hours left.",
        ReminderKind::FourHours => "⚠️ <b>Deadline approaching</b>: about 4 hours left.",
        ReminderKind::FinalHour => "🔥 <b>Less than an hour left!</b>",
        ReminderKind::Overdue => "❌ <b>Task overdue!</b>",
    };

    format!(
        "{}\n\n{}\n\n⏳ Due: {}",
        headline,
        task_summary(task),
        format_datetime(task.due_date)
    )
}

/// Overdue alert for administrators
pub fn admin_overdue_text(task: &Task, assignee: &User) -> String {
    format!(
        "❌ <b>Task overdue</b>\n\n{}\n\n👤 Assignee: {}\n⏳ Was due: {}",
        task_summary(task),
        escape_html(&assignee.display_name()),
        format_datetime(task.due_date)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_classify_boundaries() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let at = |minutes: i64| now + Duration::minutes(minutes);

        assert_eq!(ReminderKind::classify(at(-20), now), Some(ReminderKind::Overdue));
        assert_eq!(ReminderKind::classify(at(0), now), Some(ReminderKind::Overdue));
        assert_eq!(ReminderKind::classify(at(1), now), Some(ReminderKind::FinalHour));
        assert_eq!(ReminderKind::classify(at(60), now), Some(ReminderKind::FinalHour));
        assert_eq!(ReminderKind::classify(at(61), now), Some(ReminderKind::FourHours));
        assert_eq!(ReminderKind::classify(at(210), now), Some(ReminderKind::FourHours));
        assert_eq!(ReminderKind::classify(at(240), now), Some(ReminderKind::FourHours));
        assert_eq!(ReminderKind::classify(at(241), now), Some(ReminderKind::EightHours));
        assert_eq!(ReminderKind::classify(at(480), now), Some(ReminderKind::EightHours));
        assert_eq!(ReminderKind::classify(at(481), now), None);
    }

    #[test]
    fn test_only_final_hour_repeats() {
        assert_eq!(ReminderKind::FinalHour.record_kind(), None);
        assert_eq!(
            ReminderKind::Overdue.record_kind(),
            Some(NotificationKind::Overdue)
        );
        assert!(ReminderKind::Overdue.notifies_admins());
        assert!(!ReminderKind::FourHours.notifies_admins());
    }

    #[test]
    fn test_each_kind_has_a_setting() {
        assert_eq!(ReminderKind::FinalHour.setting(), NotificationSetting::FinalHour);
        assert_eq!(ReminderKind::EightHours.setting().as_str(), ReminderKind::EightHours.as_str());
        assert_eq!(ReminderKind::Overdue.setting(), NotificationSetting::Overdue);
    }
}
