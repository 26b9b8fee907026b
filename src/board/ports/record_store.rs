//! Port for the remote document store holding the board record.
//!
//! The store is key-addressed and versioned. Every successful write bumps the
//! record's version, which lets callers run optimistic transactions: read a
//! record, compute a new value, and write it back only if nobody else wrote
//! in between.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Result type for record store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

/// Value delivered on a subscription: the current record, `None` when the
/// record does not exist, or the failure that ended the feed.
pub type RecordFeed = RecordStoreResult<Option<VersionedRecord>>;

/// Key of a record in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    /// Creates a record key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic version of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordVersion(u64);

impl RecordVersion {
    /// Version of a record that does not exist.
    ///
    /// Passing it to [`RecordStore::set_if_version`] means "create only".
    pub const ABSENT: Self = Self(0);

    /// Creates a version from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the version that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A record value paired with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRecord {
    /// Document contents.
    pub value: Value,
    /// Version the contents belong to.
    pub version: RecordVersion,
}

/// Path to a field nested inside a record, one segment per object level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Creates a path addressing a top-level field.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Returns this path extended by one segment.
    #[must_use]
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// One path-scoped change applied by [`RecordStore::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Replaces the value at `path`, creating parent objects as needed.
    Set {
        /// Target field.
        path: FieldPath,
        /// New value.
        value: Value,
    },
    /// Deletes the field at `path` if present.
    Remove {
        /// Target field.
        path: FieldPath,
    },
    /// Appends `element` to the array at `path` unless an equal element is
    /// already present. A missing array is created.
    AppendUnique {
        /// Target array field.
        path: FieldPath,
        /// Element to add.
        element: Value,
    },
}

impl FieldUpdate {
    /// Creates a [`FieldUpdate::Set`].
    #[must_use]
    pub const fn set(path: FieldPath, value: Value) -> Self {
        Self::Set { path, value }
    }

    /// Creates a [`FieldUpdate::Remove`].
    #[must_use]
    pub const fn remove(path: FieldPath) -> Self {
        Self::Remove { path }
    }

    /// Creates a [`FieldUpdate::AppendUnique`].
    #[must_use]
    pub const fn append_unique(path: FieldPath, element: Value) -> Self {
        Self::AppendUnique { path, element }
    }
}

/// Push channel of full record values.
///
/// Each delivery supersedes the previous one. Dropping the subscription
/// unsubscribes.
#[derive(Debug)]
pub struct RecordSubscription {
    receiver: watch::Receiver<RecordFeed>,
}

impl RecordSubscription {
    /// Wraps a watch receiver produced by a store adapter.
    #[must_use]
    pub const fn new(receiver: watch::Receiver<RecordFeed>) -> Self {
        Self { receiver }
    }

    /// Returns the latest value and marks it as seen.
    pub fn current(&mut self) -> RecordFeed {
        self.receiver.borrow_and_update().clone()
    }

    /// Waits for the next value.
    ///
    /// Returns `None` once the store has closed the feed.
    pub async fn changed(&mut self) -> Option<RecordFeed> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }
}

/// Persistence contract for the versioned document store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads a record.
    ///
    /// Returns `None` when the record does not exist.
    async fn get(&self, key: &RecordKey) -> RecordStoreResult<Option<VersionedRecord>>;

    /// Replaces a record unconditionally, creating it when missing.
    async fn set(&self, key: &RecordKey, value: Value) -> RecordStoreResult<RecordVersion>;

    /// Replaces a record only if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::VersionConflict`] when another write has
    /// landed since `expected` was read.
    async fn set_if_version(
        &self,
        key: &RecordKey,
        value: Value,
        expected: RecordVersion,
    ) -> RecordStoreResult<RecordVersion>;

    /// Applies path-scoped updates to an existing record in one atomic write.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::MissingRecord`] when the record does not
    /// exist and [`RecordStoreError::InvalidPath`] when a path crosses a
    /// non-object value. Nothing is applied on error.
    async fn merge(
        &self,
        key: &RecordKey,
        updates: Vec<FieldUpdate>,
    ) -> RecordStoreResult<RecordVersion>;

    /// Appends `element` to the array at `path` unless already present.
    ///
    /// Creates the record and the array when missing. Safe under concurrent
    /// use because no client-side read is involved.
    async fn append_unique(
        &self,
        key: &RecordKey,
        path: &FieldPath,
        element: Value,
    ) -> RecordStoreResult<RecordVersion>;

    /// Opens a push channel for a record.
    ///
    /// The current value is available immediately; every later write is
    /// delivered as a full record.
    fn subscribe(&self, key: &RecordKey) -> RecordStoreResult<RecordSubscription>;
}

/// Errors returned by record store implementations.
#[derive(Debug, Clone, Error)]
pub enum RecordStoreError {
    /// The record does not exist.
    #[error("record not found: {0}")]
    MissingRecord(RecordKey),

    /// A conditional write lost a race with another writer.
    #[error("version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Record key.
        key: RecordKey,
        /// Version the writer read.
        expected: RecordVersion,
        /// Version currently stored.
        actual: RecordVersion,
    },

    /// A field path cannot be applied to the record's shape.
    #[error("invalid field path {path}: {reason}")]
    InvalidPath {
        /// Offending path.
        path: FieldPath,
        /// Why the path could not be applied.
        reason: String,
    },

    /// Network, permission, or quota failure.
    #[error("record store transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl RecordStoreError {
    /// Wraps a transport-layer failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns `true` for a lost optimistic-concurrency race.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}
