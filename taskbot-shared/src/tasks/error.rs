/// Failure modes of task operations

use crate::auth::AuthzError;
use crate::commands::ParseError;
use crate::store::StoreError;

/// Error type for task operations
///
/// Each variant maps to one kind of reply; only [`TaskOpError::Store`] is an
/// infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum TaskOpError {
    /// Arguments were rejected
    #[error(transparent)]
    Validation(#[from] ParseError),

    /// Caller lacks the role or is not the assignee
    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// No task with the requested ID
    #[error("Task not found")]
    TaskNotFound,

    /// No user with the requested external ID
    #[error("User {0} not found")]
    UserNotFound(String),

    /// The requested assignee is not registered
    #[error("Assignee {0} not found")]
    AssigneeNotFound(String),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TaskOpError {
    /// Whether this is an infrastructure failure rather than a user error
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, TaskOpError::Store(_))
    }
}

pub type TaskOpResult<T> = Result<T, TaskOpError>;
