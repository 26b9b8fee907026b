//! Port for the object storage holding attachment binaries.

use crate::board::domain::BlobPath;
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Result type for blob storage operations.
pub type BlobStorageResult<T> = Result<T, BlobStorageError>;

/// Stable, dereferenceable address of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    /// Wraps a URL returned by a storage backend.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Returns the URL as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper, returning the URL string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for BlobUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for BlobUrl {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Binary storage contract for attachments.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `bytes` at `path`, replacing any previous blob.
    ///
    /// Returns a stable URL the blob can be fetched from.
    async fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BlobStorageResult<BlobUrl>;

    /// Deletes the blob at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStorageError::NotFound`] when nothing is stored there.
    async fn delete(&self, path: &BlobPath) -> BlobStorageResult<()>;
}

/// Errors returned by blob storage adapters.
#[derive(Debug, Clone, Error)]
pub enum BlobStorageError {
    /// No blob is stored at the path.
    #[error("blob not found: {0}")]
    NotFound(BlobPath),

    /// Network, permission, or quota failure.
    #[error("blob storage transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl BlobStorageError {
    /// Wraps a transport-layer failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
