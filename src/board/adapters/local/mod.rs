//! Filesystem adapters for the board ports.

mod blob_storage;

pub use blob_storage::LocalDirBlobStorage;
