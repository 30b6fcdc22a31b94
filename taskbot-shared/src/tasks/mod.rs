/// Task operations on top of the store
///
/// - `service`: [`TaskService`], the create/list/detail/update operations,
///   history and comments, notification settings and user administration
/// - `error`: [`TaskOpError`], one variant per kind of reply

pub mod error;
pub mod service;

pub use error::{TaskOpError, TaskOpResult};
pub use service::{
    CommentLine, CreatedTask, HistoryLine, PostedComment, StatusChange, TaskComments,
    TaskDetails, TaskHistory, TaskService, COMMENTS_LIMIT, HISTORY_LIMIT,
};
