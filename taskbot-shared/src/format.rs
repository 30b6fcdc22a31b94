/// Text rendering helpers shared by the dispatcher and the scheduler
///
/// Replies are sent with HTML parse mode, so every user-supplied string goes
/// through [`escape_html`] before it is embedded.

use chrono::{DateTime, Utc};

use crate::models::task::{Task, TaskPriority, TaskStatus};

/// Escapes the characters Telegram's HTML mode treats as markup
///
/// ```
/// use taskbot_shared::format::escape_html;
///
/// assert_eq!(escape_html("a <b> & c"), "a &lt;b&gt; &amp; c");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "⏳ pending",
        TaskStatus::InProgress => "🔄 in progress",
        TaskStatus::Completed => "✅ completed",
        TaskStatus::Rejected => "❌ rejected",
    }
}

pub fn priority_label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "🟢 low",
        TaskPriority::Medium => "🟡 medium",
        TaskPriority::High => "🟠 high",
        TaskPriority::Urgent => "🔴 urgent",
    }
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM UTC`
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Comma-separated list of words, used in validation messages
pub fn word_list<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words.into_iter().collect::<Vec<_>>().join(", ")
}

/// One line per task, for list replies
pub fn task_line(task: &Task) -> String {
    format!(
        "📌 <b>#{}</b> {}\n    {} · {} · due {}",
        task.id,
        escape_html(&task.title),
        status_label(task.status),
        priority_label(task.priority),
        format_datetime(task.due_date),
    )
}

/// Full task card with the names of the people involved
pub fn task_card(task: &Task, assignee: &str, creator: &str) -> String {
    let mut card = format!("📋 <b>Task #{}</b>: {}\n", task.id, escape_html(&task.title));
    if !task.description.is_empty() {
        card.push_str(&format!("\n{}\n", escape_html(&task.description)));
    }
    card.push_str(&format!(
        "\nStatus: {}\nPriority: {}\nDue: {}\nAssignee: {}\nCreated by: {}\nCreated: {}",
        status_label(task.status),
        priority_label(task.priority),
        format_datetime(task.due_date),
        escape_html(assignee),
        escape_html(creator),
        format_datetime(task.created_at),
    ));
    if let Some(completed_at) = task.completed_at {
        card.push_str(&format!("\nCompleted: {}", format_datetime(completed_at)));
    }
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task() -> Task {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();
        Task {
            id: 5,
            title: "<script>".to_string(),
            description: "Fix & ship".to_string(),
            priority: TaskPriority::Urgent,
            status: TaskStatus::InProgress,
            due_date: at,
            assignee_id: 2,
            creator_id: 1,
            created_at: at,
            updated_at: at,
            completed_at: None,
        }
    }

    #[test]
    fn test_task_line_escapes_title() {
        let line = task_line(&task());
        assert!(line.contains("#5"));
        assert!(line.contains("&lt;script&gt;"));
        assert!(line.contains("2025-03-01 12:30 UTC"));
    }

    #[test]
    fn test_task_card_fields() {
        let card = task_card(&task(), "@anna", "@boss");
        assert!(card.contains("Fix &amp; ship"));
        assert!(card.contains("Assignee: @anna"));
        assert!(card.contains("🔴 urgent"));
        assert!(!card.contains("Completed:"));
    }

    #[test]
    fn test_word_list() {
        assert_eq!(word_list(["low", "high"]), "low, high");
    }
}
