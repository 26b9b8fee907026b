//! Port contracts for the board's external collaborators.
//!
//! Ports define infrastructure-agnostic interfaces used by board services.

mod blob_storage;
mod record_store;

pub use blob_storage::{BlobStorage, BlobStorageError, BlobStorageResult, BlobUrl};
pub use record_store::{
    FieldPath, FieldUpdate, RecordFeed, RecordKey, RecordStore, RecordStoreError,
    RecordStoreResult, RecordSubscription, RecordVersion, VersionedRecord,
};
