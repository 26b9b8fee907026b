//! Error types for board domain validation and lookups.

use super::{ColumnId, CommentId, SubtaskId, TaskId};
use thiserror::Error;

/// Errors returned while constructing or mutating board values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardDomainError {
    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyTaskName,

    /// The label text is empty after trimming.
    #[error("label must not be empty")]
    EmptyLabel,

    /// The subtask name is empty after trimming.
    #[error("subtask name must not be empty")]
    EmptySubtaskName,

    /// A text comment has no content.
    #[error("comment message must not be empty")]
    EmptyCommentMessage,

    /// A storage path is absolute, empty, or escapes its root.
    #[error("invalid blob path '{0}'")]
    InvalidBlobPath(String),

    /// The column does not exist on the board.
    #[error("column not found: {0}")]
    ColumnNotFound(ColumnId),

    /// The task does not exist in the given column.
    #[error("task {task_id} not found in column {column_id}")]
    TaskNotFound {
        /// Column that was searched.
        column_id: ColumnId,
        /// Missing task identifier.
        task_id: TaskId,
    },

    /// The subtask does not exist on the task.
    #[error("subtask {subtask_id} not found on task {task_id}")]
    SubtaskNotFound {
        /// Owning task.
        task_id: TaskId,
        /// Missing subtask identifier.
        subtask_id: SubtaskId,
    },

    /// The comment does not exist on the task.
    #[error("comment {comment_id} not found on task {task_id}")]
    CommentNotFound {
        /// Owning task.
        task_id: TaskId,
        /// Missing comment identifier.
        comment_id: CommentId,
    },

    /// No attachment with the storage path exists on the task.
    #[error("attachment '{path}' not found on task {task_id}")]
    AttachmentNotFound {
        /// Owning task.
        task_id: TaskId,
        /// Storage path of the missing attachment.
        path: String,
    },

    /// A column ordering does not contain exactly the board's columns.
    #[error("column ordering does not match the board's columns")]
    ColumnOrderMismatch,

    /// A task layout would lose, duplicate, or orphan tasks.
    #[error("task layout rejected: {0}")]
    TaskLayoutMismatch(String),
}

impl BoardDomainError {
    /// Returns `true` when the error reports a missing board entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ColumnNotFound(_)
                | Self::TaskNotFound { .. }
                | Self::SubtaskNotFound { .. }
                | Self::CommentNotFound { .. }
                | Self::AttachmentNotFound { .. }
        )
    }
}

/// A stored board document that cannot be interpreted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedBoardError {
    /// The document has columns but no task mapping.
    #[error("board has columns but no tasks mapping")]
    MissingTasks,

    /// A column has no entry in the task mapping.
    #[error("column {0} has no task list")]
    MissingTaskList(ColumnId),

    /// Two columns share an identifier.
    #[error("column {0} appears more than once")]
    DuplicateColumn(ColumnId),

    /// Two tasks share an identifier.
    #[error("task {0} appears more than once")]
    DuplicateTask(TaskId),

    /// The document does not match the board schema.
    #[error("board document could not be decoded: {0}")]
    Decode(String),

    /// The board could not be rendered as a document.
    #[error("board could not be encoded: {0}")]
    Encode(String),
}
