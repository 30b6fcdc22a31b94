/// Access control for Taskbot
///
/// - `access`: resolves a chat sender to a registered user (open or
///   whitelist mode)
/// - `authorization`: role and task-ownership checks

pub mod access;
pub mod authorization;

pub use access::{resolve_sender, AccessMode, AccessOutcome, SenderProfile};
pub use authorization::{can_access_task, require_admin, require_task_access, AuthzError};
