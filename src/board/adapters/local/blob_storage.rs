//! Directory-backed blob storage using capability-scoped filesystem access.

use crate::board::{
    domain::BlobPath,
    ports::{BlobStorage, BlobStorageError, BlobStorageResult, BlobUrl},
};
use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;

/// Stores attachment blobs as files beneath a root directory.
///
/// All access goes through a `cap_std` directory handle, so a blob path can
/// never reach outside the root. URLs are formed as `<base_url>/<path>`.
#[derive(Debug, Clone)]
pub struct LocalDirBlobStorage {
    root: Arc<Dir>,
    base_url: String,
}

impl LocalDirBlobStorage {
    /// Opens (creating if needed) the storage root and serves blobs from
    /// `base_url`.
    ///
    /// # Errors
    ///
    /// Returns IO errors when the root cannot be created or opened.
    pub fn open(root: &Utf8Path, base_url: impl Into<String>) -> io::Result<Self> {
        Dir::create_ambient_dir_all(root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self {
            root: Arc::new(dir),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn url_for(&self, path: &BlobPath) -> BlobUrl {
        BlobUrl::new(format!("{}/{path}", self.base_url))
    }

    async fn run_blocking<T, F>(&self, operation: F) -> io::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> io::Result<T> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || operation(&root))
            .await
            .map_err(io::Error::other)?
    }
}

#[async_trait]
impl BlobStorage for LocalDirBlobStorage {
    async fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> BlobStorageResult<BlobUrl> {
        let relative = path.as_str().to_owned();
        self.run_blocking(move |root| {
            if let Some(parent) = Utf8Path::new(&relative).parent()
                && !parent.as_str().is_empty()
            {
                root.create_dir_all(parent)?;
            }
            root.write(&relative, bytes)
        })
        .await
        .map_err(BlobStorageError::transport)?;
        Ok(self.url_for(path))
    }

    async fn delete(&self, path: &BlobPath) -> BlobStorageResult<()> {
        let relative = path.as_str().to_owned();
        match self
            .run_blocking(move |root| root.remove_file(&relative))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(BlobStorageError::NotFound(path.clone()))
            }
            Err(err) => Err(BlobStorageError::transport(err)),
        }
    }
}
