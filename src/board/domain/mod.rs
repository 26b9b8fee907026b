//! Domain model for the shared Kanban board.
//!
//! The board is a single document holding an ordered list of columns and a
//! task list per column. Tasks embed their subtasks, labels, comments, and
//! attachments. Everything here is pure: reading and writing the document is
//! left to the services through the ports.

mod attachment;
mod board;
mod column;
mod comment;
mod error;
mod ids;
mod subtask;
mod task;
mod user;

pub use attachment::{Attachment, AttachmentUpload, BlobPath};
pub use board::{Board, TaskLayout, TaskPlacement};
pub use column::{Column, DEFAULT_COLUMN_NAME};
pub use comment::{Comment, CommentMessage, NewComment, ReplyTo};
pub use error::{BoardDomainError, MalformedBoardError};
pub use ids::{ColumnId, CommentId, SubtaskId, TaskId, slugify};
pub use subtask::Subtask;
pub use task::{DueWindow, NewTask, Priority, Task, TaskPatch, normalize_label};
pub use user::{Reporter, ReporterPatch, UserRef};
