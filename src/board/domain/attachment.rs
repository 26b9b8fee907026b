//! File attachments and their storage addressing.

use super::BoardDomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage-relative key of a blob, used both to upload and to delete it.
///
/// Paths are `/`-separated, relative, and never contain empty, `.` or `..`
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobPath(String);

impl BlobPath {
    /// Creates a validated blob path.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidBlobPath`] when the path is empty,
    /// absolute, or contains empty, `.` or `..` segments.
    pub fn new(value: impl Into<String>) -> Result<Self, BoardDomainError> {
        let raw = value.into();
        let is_valid = !raw.is_empty()
            && !raw.starts_with('/')
            && !raw.contains('\\')
            && raw
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if is_valid {
            Ok(Self(raw))
        } else {
            Err(BoardDomainError::InvalidBlobPath(raw))
        }
    }

    /// Returns the path as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BlobPath {
    type Error = BoardDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BlobPath> for String {
    fn from(path: BlobPath) -> Self {
        path.0
    }
}

impl AsRef<str> for BlobPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file supplied by a consumer for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
    /// Original file name.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type reported by the client.
    pub content_type: String,
    /// Last-modified time reported by the client, if any.
    pub modified: Option<DateTime<Utc>>,
}

impl AttachmentUpload {
    /// Creates an upload payload.
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            content_type: content_type.into(),
            modified: None,
        }
    }

    /// Sets the client-reported modification time.
    #[must_use]
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Returns the upload size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}

/// A stored file attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Original file name.
    pub name: String,
    /// Stable URL of the stored blob.
    pub url: String,
    /// Storage key used to delete the blob.
    pub path: BlobPath,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Last-modified time of the source file.
    pub modified: DateTime<Utc>,
}

impl Attachment {
    /// Builds the record for an upload stored at `path` and served from `url`.
    ///
    /// Falls back to `uploaded_at` when the client sent no modification time.
    #[must_use]
    pub fn from_upload(
        upload: &AttachmentUpload,
        path: BlobPath,
        url: impl Into<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: upload.name.clone(),
            url: url.into(),
            path,
            size: upload.size(),
            content_type: upload.content_type.clone(),
            modified: upload.modified.unwrap_or(uploaded_at),
        }
    }
}
