/// Chat command parsing
///
/// - `alias`: the [`Command`] set and the static table of accepted spellings
/// - `parser`: splitting message text and typed argument parsing
/// - `error`: [`ParseError`], whose message is the reply shown to the user

pub mod alias;
pub mod error;
pub mod parser;

pub use alias::Command;
pub use error::ParseError;
pub use parser::{
    end_of_day, extract_mentions, parse_all_tasks, parse_allow_user, parse_comment,
    parse_comments, parse_create_task, parse_due_date, parse_history, parse_input,
    parse_my_tasks, parse_priority, parse_quiet_hours, parse_role, parse_set_role,
    parse_settings, parse_status, parse_task_details, parse_task_id, parse_update_status,
    validate_title, AllowUserArgs, CommentArgs, CreateTaskArgs, Input, ListArgs, SetRoleArgs,
    SettingsArgs, UpdateStatusArgs, MAX_COMMENT_LEN, MAX_TITLE_LEN,
};
