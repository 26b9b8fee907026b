//! Application services for board synchronization.

mod board;
mod cleanup;
mod config;
mod error;
mod handle;
mod live;
mod resources;

pub use board::BoardService;
pub use cleanup::{BlobCleanupFailure, CleanupReport};
pub use config::{BoardConfig, ConfigError, ConflictRetryConfig};
pub use error::{BoardErrorKind, BoardServiceError, BoardServiceResult};
pub use live::{BoardFeedError, BoardProjection, LiveBoard};
pub use resources::{LabelAdded, TaskResourceService};
