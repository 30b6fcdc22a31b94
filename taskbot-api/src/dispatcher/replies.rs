/// Reply texts

use taskbot_shared::commands::Command;
use taskbot_shared::format::{escape_html, format_datetime, status_label, task_line, word_list};
use taskbot_shared::models::comment::Comment;
use taskbot_shared::models::history::{HistoryChange, HistoryEntry};
use taskbot_shared::models::settings::{NotificationSetting, NotificationSettings};
use taskbot_shared::models::task::{Task, TaskPriority, TaskStatus};
use taskbot_shared::models::user::{Role, User};
use taskbot_shared::tasks::{CreatedTask, PostedComment, TaskComments, TaskHistory};

use super::session::{WizardStep, WIZARD_STEPS};

pub const DENIED: &str = "⛔ This command is available to administrators only.";
pub const TASK_FORBIDDEN: &str = "⛔ You do not have access to this task.";
pub const NOT_REGISTERED: &str = "👋 You are not registered yet. Send /start first.";
pub const NOT_AUTHORIZED: &str =
    "⛔ You are not authorized to use this bot. Ask an administrator to add you.";
pub const UNKNOWN_COMMAND: &str = "🤔 Unknown command. Send /help to see what I can do.";
pub const APOLOGY: &str = "😔 Something went wrong on our side. Please try again later.";
pub const TASK_NOT_FOUND: &str = "🔍 Task not found.";
pub const NO_TASKS_MINE: &str = "📭 You have no tasks.";
pub const NO_TASKS_ALL: &str = "📭 No tasks found.";
pub const WIZARD_CANCELLED: &str = "❎ Task creation cancelled.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const SETTINGS_SAVED: &str = "✅ Settings saved.";

pub fn welcome(user: &User) -> String {
    format!(
        "👋 Hello, {}!\n\nYou are registered as <b>{}</b>.\nSend /help to see available commands.",
        escape_html(&user.display_name()),
        user.role
    )
}

fn statuses() -> String {
    word_list(TaskStatus::ALL.iter().map(TaskStatus::as_str))
}

fn priorities() -> String {
    word_list(TaskPriority::ALL.iter().map(TaskPriority::as_str))
}

pub fn help(role: Role) -> String {
    let mut text = String::from(
        "📋 <b>Available commands</b>\n\n\
         /start - register and say hello\n\
         /help - this message\n\
         /my_tasks [status] - tasks assigned to you\n\
         /task_details &lt;id&gt; - show one task\n\
         /update_status &lt;id&gt; &lt;status&gt; - change a task's status\n\
         /comment &lt;id&gt; &lt;text&gt; - comment on a task, @handle to mention someone\n\
         /comments &lt;id&gt; - read a task's comments\n\
         /history &lt;id&gt; - what happened to a task\n\
         /settings - notification settings\n\
         /cancel - abort task creation\n",
    );

    if role.is_admin() {
        text.push_str(
            "\n<b>Administration</b>\n\
             /create_task - create a task step by step, or in one line:\n\
             /create_task title:\"Report\" description:\"Q3\" priority:high due_date:2025-12-25 assigned_to:&lt;user id&gt;\n\
             /all_tasks [status] [from:YYYY-MM-DD] [to:YYYY-MM-DD] - every task\n\
             /set_role &lt;user id&gt; &lt;admin|employee&gt; - change a role\n\
             /allow_user &lt;@handle&gt; [admin|employee] - add to the allow-list\n",
        );
    }

    text.push_str(&format!("\n<b>Statuses:</b> {}", statuses()));
    if role.is_admin() {
        text.push_str(&format!("\n<b>Priorities:</b> {}", priorities()));
    }
    text
}

pub fn task_list(header: &str, tasks: &[Task]) -> String {
    let mut text = format!("{} ({}):\n", header, tasks.len());
    for task in tasks {
        text.push('\n');
        text.push_str(&task_line(task));
    }
    text
}

pub fn task_created(created: &CreatedTask) -> String {
    format!(
        "✅ Task <b>#{}</b> created: {}\nAssigned to {}, due {}.",
        created.task.id,
        escape_html(&created.task.title),
        escape_html(&created.assignee.display_name()),
        format_datetime(created.task.due_date),
    )
}

pub fn task_assigned(task: &Task, creator: &User) -> String {
    format!(
        "📌 New task <b>#{}</b> from {}: {}\nDue {}.",
        task.id,
        escape_html(&creator.display_name()),
        escape_html(&task.title),
        format_datetime(task.due_date),
    )
}

pub fn status_unchanged(task: &Task) -> String {
    format!(
        "ℹ️ Task #{} already has status {}.",
        task.id,
        status_label(task.status)
    )
}

pub fn status_changed(task: &Task, previous: TaskStatus) -> String {
    format!(
        "✅ Task #{}: {} → {}",
        task.id,
        status_label(previous),
        status_label(task.status)
    )
}

pub fn status_changed_by(task: &Task, previous: TaskStatus, actor: &User) -> String {
    format!(
        "🔔 {} updated task <b>#{}</b> {}: {} → {}",
        escape_html(&actor.display_name()),
        task.id,
        escape_html(&task.title),
        status_label(previous),
        status_label(task.status)
    )
}

pub fn role_changed(user: &User) -> String {
    format!(
        "✅ {} is now <b>{}</b>.",
        escape_html(&user.display_name()),
        user.role
    )
}

pub fn user_allowed(handle: &str, role: Role) -> String {
    format!(
        "✅ @{} may now use the bot as <b>{}</b>.",
        escape_html(handle),
        role
    )
}

pub fn user_not_found(external_id: &str) -> String {
    format!(
        "🔍 User {} not found. They must send /start first.",
        escape_html(external_id)
    )
}

pub fn assignee_not_found(external_id: &str) -> String {
    format!(
        "🔍 Assignee {} is not registered. They must send /start first.",
        escape_html(external_id)
    )
}

fn author_name(author: Option<&User>) -> String {
    escape_html(
        &author
            .map(User::display_name)
            .unwrap_or_else(|| "unknown".to_string()),
    )
}

/// A stored status word as its label; anything else is shown escaped
fn stored_status(value: Option<&str>) -> String {
    let value = value.unwrap_or_default();
    match TaskStatus::from_word(value) {
        Some(status) => status_label(status).to_string(),
        None => escape_html(value),
    }
}

fn history_line(entry: &HistoryEntry, author: Option<&User>) -> String {
    let when = format_datetime(entry.created_at);
    let who = author_name(author);
    match entry.change_type {
        HistoryChange::Created => format!("🆕 {} {} created the task", when, who),
        HistoryChange::Status => format!(
            "🔀 {} {}: {} → {}",
            when,
            who,
            stored_status(entry.old_value.as_deref()),
            stored_status(entry.new_value.as_deref()),
        ),
        HistoryChange::Comment => format!(
            "💬 {} {}: {}",
            when,
            who,
            escape_html(entry.new_value.as_deref().unwrap_or_default())
        ),
    }
}

pub fn history(history: &TaskHistory) -> String {
    let mut text = format!(
        "📜 <b>History of task #{}</b>: {}\n",
        history.task.id,
        escape_html(&history.task.title)
    );
    if history.lines.is_empty() {
        text.push_str("\nNo changes recorded yet.");
    }
    for line in &history.lines {
        text.push('\n');
        text.push_str(&history_line(&line.entry, line.author.as_ref()));
    }
    text
}

fn comment_block(comment: &Comment, author: Option<&User>) -> String {
    format!(
        "💬 <b>{}</b> · {}\n{}",
        author_name(author),
        format_datetime(comment.created_at),
        escape_html(&comment.body)
    )
}

pub fn comments(comments: &TaskComments) -> String {
    let mut text = format!(
        "💬 <b>Comments on task #{}</b>: {}\n",
        comments.task.id,
        escape_html(&comments.task.title)
    );
    if comments.lines.is_empty() {
        text.push_str(&format!(
            "\nNo comments yet. Add one with {} {} &lt;text&gt;.",
            Command::Comment,
            comments.task.id
        ));
    }
    for line in &comments.lines {
        text.push_str("\n\n");
        text.push_str(&comment_block(&line.comment, line.author.as_ref()));
    }
    text
}

pub fn comment_added(posted: &PostedComment) -> String {
    let mut text = format!("✅ Comment added to task <b>#{}</b>.", posted.task.id);
    if !posted.notify.is_empty() {
        let names: Vec<String> = posted
            .notify
            .iter()
            .map(|user| escape_html(&user.display_name()))
            .collect();
        text.push_str(&format!("\n🔔 Notified: {}", names.join(", ")));
    }
    text
}

pub fn mentioned(posted: &PostedComment, author: &User) -> String {
    format!(
        "🔔 {} mentioned you on task <b>#{}</b> {}:\n\n{}",
        escape_html(&author.display_name()),
        posted.task.id,
        escape_html(&posted.task.title),
        escape_html(&posted.comment.body)
    )
}

pub fn settings(settings: &NotificationSettings) -> String {
    let mut text = String::from("⚙️ <b>Notification settings</b>\n");
    for setting in NotificationSetting::ALL {
        let mark = if settings.enabled(setting) { "✅" } else { "🔕" };
        text.push_str(&format!("\n{} {} - {}", mark, setting, setting.describe()));
    }

    match settings.quiet_hours() {
        Some(quiet) => text.push_str(&format!("\n\n🌙 Quiet hours: {} UTC", quiet)),
        None => text.push_str("\n\n🌙 Quiet hours: off"),
    }

    text.push_str(&format!(
        "\n\nChange with {} &lt;name&gt; on|off or {} quiet HH:MM-HH:MM|off",
        Command::Settings,
        Command::Settings
    ));
    text
}

pub fn validation(message: &str) -> String {
    format!("⚠️ {}", message)
}

pub fn wizard_prompt(step: WizardStep) -> String {
    let body = match step {
        WizardStep::Title => "Send the task title.".to_string(),
        WizardStep::Description => "Send a description, or - to skip.".to_string(),
        WizardStep::Priority => format!("Send the priority ({}), or - for medium.", priorities()),
        WizardStep::DueDate => {
            "Send the due date (YYYY-MM-DD, DD.MM.YYYY or YYYY-MM-DDTHH:MM), or - for end of today."
                .to_string()
        }
        WizardStep::Assignee => "Send the assignee's user ID, or me to take it yourself.".to_string(),
    };
    format!(
        "📝 Step {}/{}: {}\n{} to abort.",
        step.number(),
        WIZARD_STEPS,
        body,
        Command::Cancel
    )
}
