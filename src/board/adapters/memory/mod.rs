//! In-memory adapters for the board ports.
//!
//! Both adapters keep their state behind `Arc<RwLock<_>>`, so clones share
//! storage and several services can observe the same "remote" state.

mod blob_storage;
mod document;
mod record_store;

pub use blob_storage::{InMemoryBlobStorage, StoredBlob};
pub use record_store::InMemoryRecordStore;
