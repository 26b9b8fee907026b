//! Shared board synchronization.
//!
//! The board is one versioned record holding ordered columns and, per
//! column, the tasks it contains. Clients edit it concurrently; the
//! services here keep their edits from overwriting each other and expose a
//! live projection of the record. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
