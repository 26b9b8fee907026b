//! Service-level error types for board operations.

use crate::board::{
    domain::{BoardDomainError, MalformedBoardError},
    ports::{BlobStorageError, RecordKey, RecordStoreError},
};
use thiserror::Error;
use tokio::runtime::TryCurrentError;

/// Coarse classification of a failure, for callers that only need to choose
/// how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardErrorKind {
    /// A referenced board, column, task, or nested item does not exist.
    NotFound,
    /// The stored record does not have the expected shape.
    InvalidState,
    /// The store or blob storage could not be reached or refused the request.
    TransportFailure,
    /// Input failed validation.
    Validation,
    /// Concurrent writers kept winning the version race.
    Contention,
}

/// Service-level errors for board operations.
#[derive(Debug, Error)]
pub enum BoardServiceError {
    /// Domain validation or lookup failed.
    #[error(transparent)]
    Domain(#[from] BoardDomainError),

    /// The stored board could not be decoded or encoded.
    #[error("board record is malformed: {0}")]
    InvalidState(#[from] MalformedBoardError),

    /// The board record has not been initialized.
    #[error("board record {0} does not exist")]
    BoardMissing(RecordKey),

    /// Record store operation failed.
    #[error(transparent)]
    Store(#[from] RecordStoreError),

    /// Blob storage operation failed.
    #[error(transparent)]
    Storage(#[from] BlobStorageError),

    /// Every attempt of an optimistic transaction lost the version race.
    #[error("{operation} gave up after {attempts} conflicting attempts")]
    RetriesExhausted {
        /// Operation that was abandoned.
        operation: &'static str,
        /// Attempts made, including the first.
        attempts: u32,
    },

    /// No async runtime is available to drive a subscription.
    #[error("no async runtime to drive the board subscription")]
    NoRuntime(#[from] TryCurrentError),
}

impl BoardServiceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> BoardErrorKind {
        match self {
            Self::Domain(err) if err.is_not_found() => BoardErrorKind::NotFound,
            Self::Domain(_) => BoardErrorKind::Validation,
            Self::InvalidState(_)
            | Self::Store(RecordStoreError::InvalidPath { .. })
            | Self::NoRuntime(_) => BoardErrorKind::InvalidState,
            Self::BoardMissing(_)
            | Self::Store(RecordStoreError::MissingRecord(_))
            | Self::Storage(BlobStorageError::NotFound(_)) => BoardErrorKind::NotFound,
            Self::Store(RecordStoreError::Transport(_))
            | Self::Storage(BlobStorageError::Transport(_)) => BoardErrorKind::TransportFailure,
            Self::Store(RecordStoreError::VersionConflict { .. })
            | Self::RetriesExhausted { .. } => BoardErrorKind::Contention,
        }
    }
}

/// Result type for board service operations.
pub type BoardServiceResult<T> = Result<T, BoardServiceError>;
