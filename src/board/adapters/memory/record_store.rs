//! In-memory versioned document store for board tests and local runs.

use super::document;
use crate::board::ports::{
    FieldPath, FieldUpdate, RecordFeed, RecordKey, RecordStore, RecordStoreError,
    RecordStoreResult, RecordSubscription, RecordVersion, VersionedRecord,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

/// Thread-safe in-memory record store.
///
/// Every write bumps the record version and pushes the full record to all
/// live subscriptions for its key. Clones share the same underlying state,
/// so one instance can stand in for the remote store seen by several
/// clients.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    slots: HashMap<RecordKey, RecordSlot>,
    request_failure: Option<String>,
}

#[derive(Debug)]
struct RecordSlot {
    record: Option<VersionedRecord>,
    feed: watch::Sender<RecordFeed>,
}

impl RecordSlot {
    fn new() -> Self {
        let (feed, _) = watch::channel(Ok(None));
        Self { record: None, feed }
    }

    fn version(&self) -> RecordVersion {
        self.record
            .as_ref()
            .map_or(RecordVersion::ABSENT, |record| record.version)
    }

    fn commit(&mut self, value: Value) -> RecordVersion {
        let version = self.version().next();
        let record = VersionedRecord { value, version };
        self.record = Some(record.clone());
        self.feed.send_replace(Ok(Some(record)));
        version
    }
}

fn lock_error(err: impl std::fmt::Display) -> RecordStoreError {
    RecordStoreError::transport(std::io::Error::other(err.to_string()))
}

impl InMemoryStoreState {
    fn check_available(&self) -> RecordStoreResult<()> {
        match &self.request_failure {
            Some(reason) => Err(RecordStoreError::transport(std::io::Error::other(
                reason.clone(),
            ))),
            None => Ok(()),
        }
    }

    fn slot_mut(&mut self, key: &RecordKey) -> &mut RecordSlot {
        self.slots.entry(key.clone()).or_insert_with(RecordSlot::new)
    }
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> RecordStoreResult<RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state.read().map_err(lock_error)
    }

    fn write_state(&self) -> RecordStoreResult<RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state.write().map_err(lock_error)
    }

    /// Makes every subsequent read and write fail with a transport error.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn fail_requests(&self, reason: impl Into<String>) -> RecordStoreResult<()> {
        self.write_state()?.request_failure = Some(reason.into());
        Ok(())
    }

    /// Clears a failure installed by [`InMemoryRecordStore::fail_requests`].
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn restore_requests(&self) -> RecordStoreResult<()> {
        self.write_state()?.request_failure = None;
        Ok(())
    }

    /// Fails and closes every live subscription for `key`.
    ///
    /// Subscribers receive a transport error followed by the end of their
    /// feed. New subscriptions are unaffected.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn disconnect(&self, key: &RecordKey, reason: impl Into<String>) -> RecordStoreResult<()> {
        let mut state = self.write_state()?;
        let slot = state.slot_mut(key);
        slot.feed
            .send_replace(Err(RecordStoreError::transport(std::io::Error::other(
                reason.into(),
            ))));
        let (feed, _) = watch::channel(Ok(slot.record.clone()));
        slot.feed = feed;
        Ok(())
    }

    /// Returns the number of live subscriptions for `key`.
    ///
    /// # Errors
    ///
    /// Returns transport errors when lock acquisition fails.
    pub fn subscriber_count(&self, key: &RecordKey) -> RecordStoreResult<usize> {
        let state = self.read_state()?;
        Ok(state
            .slots
            .get(key)
            .map_or(0, |slot| slot.feed.receiver_count()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> RecordStoreResult<Option<VersionedRecord>> {
        let state = self.read_state()?;
        state.check_available()?;
        Ok(state.slots.get(key).and_then(|slot| slot.record.clone()))
    }

    async fn set(&self, key: &RecordKey, value: Value) -> RecordStoreResult<RecordVersion> {
        let mut state = self.write_state()?;
        state.check_available()?;
        Ok(state.slot_mut(key).commit(value))
    }

    async fn set_if_version(
        &self,
        key: &RecordKey,
        value: Value,
        expected: RecordVersion,
    ) -> RecordStoreResult<RecordVersion> {
        let mut state = self.write_state()?;
        state.check_available()?;
        let slot = state.slot_mut(key);
        let actual = slot.version();
        if actual != expected {
            return Err(RecordStoreError::VersionConflict {
                key: key.clone(),
                expected,
                actual,
            });
        }
        Ok(slot.commit(value))
    }

    async fn merge(
        &self,
        key: &RecordKey,
        updates: Vec<FieldUpdate>,
    ) -> RecordStoreResult<RecordVersion> {
        let mut state = self.write_state()?;
        state.check_available()?;
        let slot = state.slot_mut(key);
        let mut document = slot
            .record
            .as_ref()
            .map(|record| record.value.clone())
            .ok_or_else(|| RecordStoreError::MissingRecord(key.clone()))?;
        for update in updates {
            document::apply_update(&mut document, update)?;
        }
        Ok(slot.commit(document))
    }

    async fn append_unique(
        &self,
        key: &RecordKey,
        path: &FieldPath,
        element: Value,
    ) -> RecordStoreResult<RecordVersion> {
        let mut state = self.write_state()?;
        state.check_available()?;
        let slot = state.slot_mut(key);
        let mut document = slot
            .record
            .as_ref()
            .map_or_else(|| Value::Object(serde_json::Map::new()), |record| record.value.clone());
        if document::append_unique(&mut document, path, element)? {
            Ok(slot.commit(document))
        } else {
            Ok(slot.version())
        }
    }

    fn subscribe(&self, key: &RecordKey) -> RecordStoreResult<RecordSubscription> {
        let mut state = self.write_state()?;
        let receiver = state.slot_mut(key).feed.subscribe();
        Ok(RecordSubscription::new(receiver))
    }
}
