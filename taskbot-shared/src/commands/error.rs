/// Parse failures
///
/// The `Display` text is the corrective reply sent to the user, already
/// escaped for HTML parse mode

use crate::format::{escape_html, word_list};
use crate::models::settings::NotificationSetting;
use crate::models::task::{TaskPriority, TaskStatus};
use crate::models::user::Role;

/// Why a command's arguments were rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Required arguments are missing; carries the usage line
    #[error("Usage: {}", escape_html(.0))]
    Usage(&'static str),

    #[error("A task title is required, e.g. /create_task title:\"Monthly report\"")]
    MissingTitle,

    #[error("The title is too long (at most {max} characters)")]
    TitleTooLong { max: u64 },

    #[error("Unknown priority \"{}\". Valid priorities: {}", escape_html(.0), priority_words())]
    InvalidPriority(String),

    #[error("Unknown status \"{}\". Valid statuses: {}", escape_html(.0), status_words())]
    InvalidStatus(String),

    #[error("Cannot read date \"{}\". Use YYYY-MM-DD, DD.MM.YYYY or YYYY-MM-DDTHH:MM", escape_html(.0))]
    InvalidDate(String),

    #[error("The start date must not be after the end date")]
    InvalidDateRange,

    #[error("Task ID must be a number, got \"{}\"", escape_html(.0))]
    InvalidTaskId(String),

    #[error("Assignee must be a numeric user ID, got \"{}\"", escape_html(.0))]
    InvalidAssignee(String),

    #[error("Unknown role \"{}\". Valid roles: {}", escape_html(.0), role_words())]
    InvalidRole(String),

    #[error("\"{}\" is not a valid handle", escape_html(.0))]
    InvalidHandle(String),

    #[error("The comment is too long (at most {max} characters)")]
    CommentTooLong { max: u64 },

    #[error("Unknown setting \"{}\". Valid settings: {}, quiet", escape_html(.0), setting_words())]
    InvalidSetting(String),

    #[error("Cannot read quiet hours \"{}\". Use HH:MM-HH:MM or off", escape_html(.0))]
    InvalidQuietHours(String),
}

fn priority_words() -> String {
    word_list(TaskPriority::ALL.iter().map(TaskPriority::as_str))
}

fn status_words() -> String {
    word_list(TaskStatus::ALL.iter().map(TaskStatus::as_str))
}

fn setting_words() -> String {
    word_list(NotificationSetting::ALL.iter().map(NotificationSetting::as_str))
}

fn role_words() -> String {
    word_list(Role::ALL.iter().map(Role::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_list_valid_words() {
        let message = ParseError::InvalidStatus("done".to_string()).to_string();
        assert!(message.contains("\"done\""));
        assert!(message.contains("pending, in_progress, completed, rejected"));

        let message = ParseError::InvalidPriority("<x>".to_string()).to_string();
        assert!(message.contains("&lt;x&gt;"));
        assert!(message.contains("low, medium, high, urgent"));
    }

    #[test]
    fn test_usage_placeholders_are_escaped() {
        let message = ParseError::Usage("/task_details <task_id>").to_string();
        assert_eq!(message, "Usage: /task_details &lt;task_id&gt;");

        let message = ParseError::Usage("/set_role <user_id> <admin|employee>").to_string();
        assert!(!message.contains('<'));
        assert!(message.contains("&lt;admin|employee&gt;"));
    }

    #[test]
    fn test_setting_message_lists_words() {
        let message = ParseError::InvalidSetting("<2h>".to_string()).to_string();
        assert!(message.contains("&lt;2h&gt;"));
        assert!(message.contains("8h, 4h, 1h, overdue, comments, quiet"));
    }
}
