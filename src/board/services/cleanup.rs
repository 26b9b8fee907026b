//! Best-effort release of blobs owned by removed board items.

use crate::board::{
    domain::BlobPath,
    ports::{BlobStorage, BlobStorageError},
};
use tracing::{debug, warn};

/// A blob that could not be deleted after its owner was removed.
#[derive(Debug, Clone)]
pub struct BlobCleanupFailure {
    /// Storage path of the orphaned blob.
    pub path: BlobPath,
    /// Error reported by blob storage.
    pub error: BlobStorageError,
}

/// Outcome of releasing the blobs of removed tasks or attachments.
///
/// The owning record change has already been committed; failures listed
/// here leave orphaned blobs behind and are otherwise harmless.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// Paths deleted, or already absent, in storage.
    pub released: Vec<BlobPath>,
    /// Paths that storage refused to delete.
    pub failures: Vec<BlobCleanupFailure>,
}

impl CleanupReport {
    /// Returns `true` when every blob was released.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub(crate) async fn release_blobs<B>(storage: &B, paths: Vec<BlobPath>) -> CleanupReport
where
    B: BlobStorage + ?Sized,
{
    let mut report = CleanupReport::default();
    for path in paths {
        match storage.delete(&path).await {
            Ok(()) => report.released.push(path),
            Err(BlobStorageError::NotFound(_)) => {
                debug!(path = %path, "blob already absent");
                report.released.push(path);
            }
            Err(error) => {
                warn!(path = %path, error = %error, "failed to release blob");
                report.failures.push(BlobCleanupFailure { path, error });
            }
        }
    }
    report
}
