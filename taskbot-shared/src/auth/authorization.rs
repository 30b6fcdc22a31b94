/// Permission checks
///
/// Two rules cover every command:
///
/// 1. **Role**: some commands are reserved for administrators.
/// 2. **Ownership**: reading or changing a task requires being an
///    administrator or the task's assignee.
///
/// Both checks are pure functions over already-loaded rows, so callers look
/// the task up first and report "not found" before "forbidden".
///
/// # Example
///
/// ```
/// use taskbot_shared::auth::authorization::{require_admin, AuthzError};
/// # use taskbot_shared::models::user::{Role, User};
/// # use chrono::Utc;
/// # let user = User {
/// #     id: 1, external_id: "1".into(), first_name: None, last_name: None,
/// #     handle: None, role: Role::Employee, created_at: Utc::now(), updated_at: Utc::now(),
/// # };
///
/// assert_eq!(require_admin(&user), Err(AuthzError::AdminRequired));
/// ```

use crate::models::task::Task;
use crate::models::user::User;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Command is reserved for administrators
    #[error("Administrator role required")]
    AdminRequired,

    /// Caller is neither an administrator nor the assignee
    #[error("Not authorized to access task {task_id}")]
    NotAssignee { task_id: i64 },
}

/// Requires the administrator role
pub fn require_admin(user: &User) -> Result<(), AuthzError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Whether the user may read or change the task
pub fn can_access_task(user: &User, task: &Task) -> bool {
    user.is_admin() || task.is_assigned_to(user.id)
}

/// Requires that the user may read or change the task
pub fn require_task_access(user: &User, task: &Task) -> Result<(), AuthzError> {
    if can_access_task(user, task) {
        Ok(())
    } else {
        Err(AuthzError::NotAssignee { task_id: task.id })
    }
}
