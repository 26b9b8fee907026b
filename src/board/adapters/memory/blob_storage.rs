//! In-memory blob storage for attachment tests.

use crate::board::{
    domain::BlobPath,
    ports::{BlobStorage, BlobStorageError, BlobStorageResult, BlobUrl},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A blob held by [`InMemoryBlobStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Blob contents.
    pub bytes: Vec<u8>,
    /// MIME type given at upload.
    pub content_type: String,
}

/// Thread-safe in-memory blob storage.
///
/// URLs take the form `memory://<path>`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStorage {
    state: Arc<RwLock<InMemoryBlobState>>,
}

#[derive(Debug, Default)]
struct InMemoryBlobState {
    blobs: HashMap<BlobPath, StoredBlob>,
    upload_failure: Option<String>,
    delete_failure: Option<String>,
}

fn storage_error(reason: impl Into<String>) -> BlobStorageError {
    BlobStorageError::transport(std::io::Error::other(reason.into()))
}

impl InMemoryBlobStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blob stored at `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn blob(&self, path: &BlobPath) -> BlobStorageResult<Option<StoredBlob>> {
        let state = self
            .state
            .read()
            .map_err(|err| storage_error(err.to_string()))?;
        Ok(state.blobs.get(path).cloned())
    }

    /// Returns the number of stored blobs.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn blob_count(&self) -> BlobStorageResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|err| storage_error(err.to_string()))?;
        Ok(state.blobs.len())
    }

    /// Makes uploads fail with a transport error until restored.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_uploads(&self, reason: impl Into<String>) -> BlobStorageResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| storage_error(err.to_string()))?;
        state.upload_failure = Some(reason.into());
        Ok(())
    }

    /// Makes deletes fail with a transport error until restored.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_deletes(&self, reason: impl Into<String>) -> BlobStorageResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| storage_error(err.to_string()))?;
        state.delete_failure = Some(reason.into());
        Ok(())
    }

    /// Clears installed upload and delete failures.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn restore(&self) -> BlobStorageResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| storage_error(err.to_string()))?;
        state.upload_failure = None;
        state.delete_failure = None;
        Ok(())
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> BlobStorageResult<BlobUrl> {
        let mut state = self
            .state
            .write()
            .map_err(|err| storage_error(err.to_string()))?;
        if let Some(reason) = &state.upload_failure {
            return Err(storage_error(reason.clone()));
        }
        state.blobs.insert(
            path.clone(),
            StoredBlob {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(BlobUrl::new(format!("memory://{path}")))
    }

    async fn delete(&self, path: &BlobPath) -> BlobStorageResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| storage_error(err.to_string()))?;
        if let Some(reason) = &state.delete_failure {
            return Err(storage_error(reason.clone()));
        }
        state
            .blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BlobStorageError::NotFound(path.clone()))
    }
}
