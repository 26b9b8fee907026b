//! Shared fixtures for board unit tests.

use std::sync::Arc;

use crate::board::{
    adapters::memory::{InMemoryBlobStorage, InMemoryRecordStore},
    domain::UserRef,
    services::{BoardConfig, BoardService, ConflictRetryConfig},
};
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::fixture;

#[derive(Debug, Clone, Copy)]
pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl FixedClock {
    pub(super) fn at_noon() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0)
                .single()
                .expect("valid fixed timestamp"),
        )
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) type TestService = BoardService<InMemoryRecordStore, InMemoryBlobStorage, FixedClock>;

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryRecordStore>,
    pub(super) storage: Arc<InMemoryBlobStorage>,
    pub(super) service: TestService,
}

impl Harness {
    pub(super) fn with_config(config: BoardConfig) -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let storage = Arc::new(InMemoryBlobStorage::new());
        let service = BoardService::new(
            Arc::clone(&store),
            Arc::clone(&storage),
            Arc::new(FixedClock::at_noon()),
            config,
        );
        Self {
            store,
            storage,
            service,
        }
    }
}

#[fixture]
pub(super) fn harness() -> Harness {
    Harness::with_config(
        BoardConfig::default().with_retry(ConflictRetryConfig {
            initial_backoff: std::time::Duration::from_millis(1),
            max_backoff: std::time::Duration::from_millis(5),
            ..ConflictRetryConfig::default()
        }),
    )
}

#[fixture]
pub(super) fn alice() -> UserRef {
    UserRef::new("alice", "Alice Example").with_photo_url("https://example.test/alice.png")
}

#[fixture]
pub(super) fn bob() -> UserRef {
    UserRef::new("bob", "Bob Example")
}
