//! Shared helpers for in-memory board integration tests.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use boardsync::board::{
    adapters::memory::{InMemoryBlobStorage, InMemoryRecordStore},
    domain::UserRef,
    ports::{
        FieldPath, FieldUpdate, RecordKey, RecordStore, RecordStoreResult, RecordSubscription,
        RecordVersion, VersionedRecord,
    },
    services::{BoardConfig, BoardService, ConflictRetryConfig},
};
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Barrier;

/// Board service wired to in-memory adapters.
pub type MemoryBoardService<S = InMemoryRecordStore> =
    BoardService<S, InMemoryBlobStorage, DefaultClock>;

/// Retry policy with short delays for fast tests.
#[must_use]
pub fn quick_retry() -> ConflictRetryConfig {
    ConflictRetryConfig {
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        ..ConflictRetryConfig::default()
    }
}

/// Builds a client of `store` with its own blob storage.
#[must_use]
pub fn client<S: RecordStore>(store: Arc<S>, retry: ConflictRetryConfig) -> MemoryBoardService<S> {
    BoardService::new(
        store,
        Arc::new(InMemoryBlobStorage::new()),
        Arc::new(DefaultClock),
        BoardConfig::default().with_retry(retry),
    )
}

/// Provides a shared in-memory store.
#[fixture]
pub fn store() -> Arc<InMemoryRecordStore> {
    Arc::new(InMemoryRecordStore::new())
}

/// Provides a user acting on the board.
#[fixture]
pub fn alice() -> UserRef {
    UserRef::new("alice", "Alice")
}

/// Provides a second user acting on the board.
#[fixture]
pub fn bob() -> UserRef {
    UserRef::new("bob", "Bob")
}

/// Record store that holds armed reads at a barrier until every party has
/// read, forcing concurrent transactions to start from the same version.
pub struct GatedStore {
    inner: InMemoryRecordStore,
    gate: Barrier,
    armed: AtomicUsize,
}

impl GatedStore {
    /// Wraps `inner`; reads pass straight through until [`GatedStore::arm`].
    #[must_use]
    pub fn new(inner: InMemoryRecordStore, parties: usize) -> Self {
        Self {
            inner,
            gate: Barrier::new(parties),
            armed: AtomicUsize::new(0),
        }
    }

    /// Gates the next `reads` reads.
    pub fn arm(&self, reads: usize) {
        self.armed.store(reads, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn get(&self, key: &RecordKey) -> RecordStoreResult<Option<VersionedRecord>> {
        let record = self.inner.get(key).await?;
        let gated = self
            .armed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |reads| {
                reads.checked_sub(1)
            })
            .is_ok();
        if gated {
            self.gate.wait().await;
        }
        Ok(record)
    }

    async fn set(&self, key: &RecordKey, value: Value) -> RecordStoreResult<RecordVersion> {
        self.inner.set(key, value).await
    }

    async fn set_if_version(
        &self,
        key: &RecordKey,
        value: Value,
        expected: RecordVersion,
    ) -> RecordStoreResult<RecordVersion> {
        self.inner.set_if_version(key, value, expected).await
    }

    async fn merge(
        &self,
        key: &RecordKey,
        updates: Vec<FieldUpdate>,
    ) -> RecordStoreResult<RecordVersion> {
        self.inner.merge(key, updates).await
    }

    async fn append_unique(
        &self,
        key: &RecordKey,
        path: &FieldPath,
        element: Value,
    ) -> RecordStoreResult<RecordVersion> {
        self.inner.append_unique(key, path, element).await
    }

    fn subscribe(&self, key: &RecordKey) -> RecordStoreResult<RecordSubscription> {
        self.inner.subscribe(key)
    }
}
