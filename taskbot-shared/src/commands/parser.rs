/// Command text parsing
///
/// Turns the raw text of a chat message into a [`Command`] and a typed
/// argument bag. Parsing never touches the store; checks that need data
/// (does the assignee exist, may the caller see the task) happen in
/// `crate::tasks`.
///
/// # Create-task syntax
///
/// ```text
/// /create_task title:"Monthly report" description:"Q3 numbers" priority:high
///              due_date:2025-12-25 assigned_to:123456789
/// ```
///
/// Keys may appear in any order; each is read independently and unknown keys
/// are ignored. Only `title` is required.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use taskbot_shared::commands::{parse_create_task, parse_input, Command, Input};
///
/// let input = parse_input("/create_task@taskbot title:\"Report\" priority:urgent");
/// let Input::Command { command, args } = input else { panic!() };
/// assert_eq!(command, Command::CreateTask);
///
/// let parsed = parse_create_task(args, Utc::now()).unwrap();
/// assert_eq!(parsed.title, "Report");
/// ```

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use validator::ValidateLength;

use super::alias::Command;
use super::error::ParseError;
use crate::models::allowed_user::normalize_handle;
use crate::models::settings::{NotificationSetting, QuietHours};
use crate::models::task::{TaskPriority, TaskStatus};
use crate::models::user::Role;

/// Maximum task title length in characters
pub const MAX_TITLE_LEN: u64 = 255;

/// Maximum comment length in characters
pub const MAX_COMMENT_LEN: u64 = 2000;

/// A message split into command and arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    /// A known command; `args` is the trimmed remainder of the text
    Command { command: Command, args: &'a str },

    /// Slash-prefixed token that matches no command
    UnknownCommand(String),

    /// Plain text (no leading slash)
    Text(&'a str),
}

/// Splits message text into command and arguments
///
/// The command token is lower-cased and an `@botname` suffix is removed
/// before the alias lookup.
pub fn parse_input(text: &str) -> Input<'_> {
    let text = text.trim();
    if !text.starts_with('/') {
        return Input::Text(text);
    }

    let (token, rest) = match text.find(char::is_whitespace) {
        Some(index) => (&text[..index], text[index..].trim()),
        None => (text, ""),
    };

    let token = token.to_lowercase();
    let token = match token.split_once('@') {
        Some((name, _bot)) => name.to_string(),
        None => token,
    };

    match Command::from_token(&token) {
        Some(command) => Input::Command {
            command,
            args: rest,
        },
        None => Input::UnknownCommand(token),
    }
}

/// Arguments of `/create_task`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskArgs {
    /// Trimmed, 1 to [`MAX_TITLE_LEN`] characters
    pub title: String,

    pub description: String,

    pub priority: TaskPriority,

    pub due_date: DateTime<Utc>,

    /// Raw assignee token; None means the creator
    pub assignee: Option<String>,
}

/// Arguments of `/update_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateStatusArgs {
    /// None when the number cannot name an existing task
    pub task_id: Option<i64>,
    pub status: TaskStatus,
}

/// Arguments of `/all_tasks`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    pub status: Option<TaskStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

/// Arguments of `/set_role`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRoleArgs {
    pub external_id: String,
    pub role: Role,
}

/// Arguments of `/allow_user`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowUserArgs {
    /// Normalized handle
    pub handle: String,
    pub role: Role,
}

/// Arguments of `/comment`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentArgs {
    /// None when the number cannot name an existing task
    pub task_id: Option<i64>,
    pub body: String,
}

/// What `/settings` was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsArgs {
    Show,
    Toggle {
        setting: NotificationSetting,
        enabled: bool,
    },

    /// None turns quiet hours off
    QuietHours(Option<QuietHours>),
}

/// Extracts `key:"quoted value"` and `key:bareword` pairs
///
/// The first occurrence of a key wins. Straight, curly and angle quotes are
/// accepted since mobile keyboards substitute them.
fn key_values(text: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        // Read a word up to ':' or whitespace.
        let mut end = start;
        let mut has_colon = false;
        while let Some(&(index, ch)) = chars.peek() {
            if ch == ':' {
                end = index;
                has_colon = true;
                chars.next();
                break;
            }
            if ch.is_whitespace() {
                end = index;
                break;
            }
            end = index + ch.len_utf8();
            chars.next();
        }

        if !has_colon {
            continue;
        }
        let key = text[start..end].to_lowercase();

        let closing = match chars.peek() {
            Some(&(_, '"')) => Some('"'),
            Some(&(_, '“')) => Some('”'),
            Some(&(_, '«')) => Some('»'),
            _ => None,
        };

        let mut value = String::new();
        match closing {
            Some(closing) => {
                chars.next();
                for (_, ch) in chars.by_ref() {
                    if ch == closing || (closing == '”' && ch == '"') {
                        break;
                    }
                    value.push(ch);
                }
            }
            None => {
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_whitespace() {
                        break;
                    }
                    value.push(ch);
                    chars.next();
                }
            }
        }

        if !key.is_empty() && !pairs.iter().any(|(k, _)| *k == key) {
            pairs.push((key, value.trim().to_string()));
        }
    }

    pairs
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Last second of the UTC day containing `at`
///
/// Saturates at the latest representable instant.
pub fn end_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    end_of_date(at.date_naive()).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Start of the day after `date`; None past the calendar's end
fn start_of_next_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    let next = date.succ_opt()?;
    Some(Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)))
}

fn end_of_date(date: NaiveDate) -> Option<DateTime<Utc>> {
    start_of_next_day(date).map(|next| next - Duration::seconds(1))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d.%m.%Y"))
        .ok()
}

/// Parses a deadline
///
/// Dates without a time mean the end of that day (UTC).
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>, ParseError> {
    let value = value.trim();

    if let Some(date) = parse_date(value) {
        return end_of_date(date).ok_or_else(|| ParseError::InvalidDate(value.to_string()));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ParseError::InvalidDate(value.to_string()))
}

pub fn parse_priority(value: &str) -> Result<TaskPriority, ParseError> {
    TaskPriority::from_word(value).ok_or_else(|| ParseError::InvalidPriority(value.to_string()))
}

pub fn parse_status(value: &str) -> Result<TaskStatus, ParseError> {
    TaskStatus::from_word(value).ok_or_else(|| ParseError::InvalidStatus(value.to_string()))
}

pub fn parse_role(value: &str) -> Result<Role, ParseError> {
    value
        .parse::<Role>()
        .map_err(|_| ParseError::InvalidRole(value.to_string()))
}

/// Validates a task title
pub fn validate_title(title: &str) -> Result<String, ParseError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ParseError::MissingTitle);
    }
    if !<str as ValidateLength<u64>>::validate_length(title, None, Some(MAX_TITLE_LEN), None) {
        return Err(ParseError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(title.to_string())
}

/// Parses a task ID
///
/// Numbers that cannot name a task (zero, negative, beyond `i64`) give
/// `Ok(None)` so the caller reports "not found" rather than a syntax error.
pub fn parse_task_id(token: &str) -> Result<Option<i64>, ParseError> {
    let digits = token.strip_prefix(&['-', '+'][..]).unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::InvalidTaskId(token.to_string()));
    }

    Ok(token.parse::<i64>().ok().filter(|id| *id > 0))
}

/// Parses `/create_task` arguments
///
/// `now` supplies the default deadline (end of the current UTC day).
pub fn parse_create_task(args: &str, now: DateTime<Utc>) -> Result<CreateTaskArgs, ParseError> {
    let pairs = key_values(args);

    let title = validate_title(lookup(&pairs, "title").unwrap_or_default())?;

    let description = lookup(&pairs, "description")
        .unwrap_or_default()
        .to_string();

    let priority = match lookup(&pairs, "priority") {
        Some(value) => parse_priority(value)?,
        None => TaskPriority::default(),
    };

    let due_date = match lookup(&pairs, "due_date") {
        Some(value) => parse_due_date(value)?,
        None => end_of_day(now),
    };

    let assignee = lookup(&pairs, "assigned_to")
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Ok(CreateTaskArgs {
        title,
        description,
        priority,
        due_date,
        assignee,
    })
}

/// Parses `/update_status <id> <status>`
pub fn parse_update_status(args: &str) -> Result<UpdateStatusArgs, ParseError> {
    let mut tokens = args.split_whitespace();
    let (id, status) = match (tokens.next(), tokens.next()) {
        (Some(id), Some(status)) => (id, status),
        _ => return Err(ParseError::Usage("/update_status <task_id> <status>")),
    };

    Ok(UpdateStatusArgs {
        task_id: parse_task_id(id)?,
        status: parse_status(status)?,
    })
}

/// Parses `/task_details <id>`
pub fn parse_task_details(args: &str) -> Result<Option<i64>, ParseError> {
    match args.split_whitespace().next() {
        Some(id) => parse_task_id(id),
        None => Err(ParseError::Usage("/task_details <task_id>")),
    }
}

/// Parses `/my_tasks [status]`
pub fn parse_my_tasks(args: &str) -> Result<Option<TaskStatus>, ParseError> {
    match args.split_whitespace().next() {
        Some(token) => {
            let word = token.strip_prefix("status:").unwrap_or(token);
            parse_status(word).map(Some)
        }
        None => Ok(None),
    }
}

/// Parses `/all_tasks [status] [status:<s>] [from:<date>] [to:<date>]`
///
/// Date bounds apply to the creation time and are inclusive.
pub fn parse_all_tasks(args: &str) -> Result<ListArgs, ParseError> {
    let mut list = ListArgs::default();

    for token in args.split_whitespace() {
        match token.split_once(':') {
            Some((key, value)) => match key.to_lowercase().as_str() {
                "status" => list.status = Some(parse_status(value)?),
                "from" => {
                    let date = parse_date(value)
                        .ok_or_else(|| ParseError::InvalidDate(value.to_string()))?;
                    list.created_from = Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
                }
                "to" => {
                    let next_day = parse_date(value)
                        .and_then(start_of_next_day)
                        .ok_or_else(|| ParseError::InvalidDate(value.to_string()))?;
                    list.created_to = Some(next_day - Duration::nanoseconds(1));
                }
                _ => {}
            },
            None => list.status = Some(parse_status(token)?),
        }
    }

    if let (Some(from), Some(to)) = (list.created_from, list.created_to) {
        if from > to {
            return Err(ParseError::InvalidDateRange);
        }
    }

    Ok(list)
}

/// Parses `/history <id>`
pub fn parse_history(args: &str) -> Result<Option<i64>, ParseError> {
    match args.split_whitespace().next() {
        Some(id) => parse_task_id(id),
        None => Err(ParseError::Usage("/history <task_id>")),
    }
}

/// Parses `/comments <id>`
pub fn parse_comments(args: &str) -> Result<Option<i64>, ParseError> {
    match args.split_whitespace().next() {
        Some(id) => parse_task_id(id),
        None => Err(ParseError::Usage("/comments <task_id>")),
    }
}

/// Parses `/comment <id> <text>`; the text keeps its inner line breaks
pub fn parse_comment(args: &str) -> Result<CommentArgs, ParseError> {
    const USAGE: &str = "/comment <task_id> <text>";

    let args = args.trim();
    let (id, body) = match args.find(char::is_whitespace) {
        Some(index) => (&args[..index], args[index..].trim()),
        None => (args, ""),
    };
    if id.is_empty() || body.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }

    let task_id = parse_task_id(id)?;
    if !<str as ValidateLength<u64>>::validate_length(body, None, Some(MAX_COMMENT_LEN), None) {
        return Err(ParseError::CommentTooLong { max: MAX_COMMENT_LEN });
    }

    Ok(CommentArgs {
        task_id,
        body: body.to_string(),
    })
}

/// Handles mentioned as `@name` in `text`, normalized and without repeats
///
/// ```
/// use taskbot_shared::commands::extract_mentions;
///
/// assert_eq!(extract_mentions("cc @Anna and @anna, @bob!"), ["anna", "bob"]);
/// ```
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();

    for (index, _) in text.match_indices('@') {
        let preceded_by_word = text[..index]
            .chars()
            .next_back()
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_');
        if preceded_by_word {
            continue;
        }

        let handle: String = text[index + 1..]
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .collect();
        if handle.is_empty() {
            continue;
        }

        let handle = normalize_handle(&handle);
        if !mentions.contains(&handle) {
            mentions.push(handle);
        }
    }

    mentions
}

fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

/// Parses `HH:MM-HH:MM`
pub fn parse_quiet_hours(value: &str) -> Result<QuietHours, ParseError> {
    let invalid = || ParseError::InvalidQuietHours(value.to_string());

    let (start, end) = value.split_once('-').ok_or_else(invalid)?;
    let start = parse_clock(start).ok_or_else(invalid)?;
    let end = parse_clock(end).ok_or_else(invalid)?;
    if start == end {
        return Err(invalid());
    }

    Ok(QuietHours { start, end })
}

/// Parses `/settings`, `/settings <kind> on|off` and
/// `/settings quiet HH:MM-HH:MM|off`
pub fn parse_settings(args: &str) -> Result<SettingsArgs, ParseError> {
    const USAGE: &str = "/settings [8h|4h|1h|overdue|comments on|off] [quiet HH:MM-HH:MM|off]";

    let mut tokens = args.split_whitespace();
    let Some(name) = tokens.next() else {
        return Ok(SettingsArgs::Show);
    };
    let value = tokens.next().ok_or(ParseError::Usage(USAGE))?;

    if name.eq_ignore_ascii_case("quiet") {
        if value.eq_ignore_ascii_case("off") {
            return Ok(SettingsArgs::QuietHours(None));
        }
        return parse_quiet_hours(value).map(|quiet| SettingsArgs::QuietHours(Some(quiet)));
    }

    let setting = NotificationSetting::from_word(name)
        .ok_or_else(|| ParseError::InvalidSetting(name.to_string()))?;
    let enabled = match value.to_lowercase().as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(ParseError::Usage(USAGE)),
    };

    Ok(SettingsArgs::Toggle { setting, enabled })
}

/// Parses `/set_role <external_id> <role>`
pub fn parse_set_role(args: &str) -> Result<SetRoleArgs, ParseError> {
    let mut tokens = args.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(external_id), Some(role)) => Ok(SetRoleArgs {
            external_id: external_id.to_string(),
            role: parse_role(role)?,
        }),
        _ => Err(ParseError::Usage("/set_role <user_id> <admin|employee>")),
    }
}

/// Parses `/allow_user <handle> [role]`; the role defaults to employee
pub fn parse_allow_user(args: &str) -> Result<AllowUserArgs, ParseError> {
    let mut tokens = args.split_whitespace();
    let raw = tokens
        .next()
        .ok_or(ParseError::Usage("/allow_user <@handle> [admin|employee]"))?;

    let handle = normalize_handle(raw);
    if handle.is_empty() || !handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ParseError::InvalidHandle(raw.to_string()));
    }

    let role = match tokens.next() {
        Some(role) => parse_role(role)?,
        None => Role::Employee,
    };

    Ok(AllowUserArgs { handle, role })
}
