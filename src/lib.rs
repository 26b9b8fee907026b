//! Boardsync: shared Kanban board synchronization.
//!
//! This crate keeps a single board record, its ordered columns, and the
//! tasks in each column consistent across concurrently editing clients
//! backed by a versioned document store.
//!
//! # Architecture
//!
//! Boardsync follows hexagonal architecture principles:
//!
//! - **Domain**: Board, column, and task values with their invariants
//! - **Ports**: Record store and blob storage contracts
//! - **Adapters**: In-memory and local-directory implementations of ports
//!
//! # Modules
//!
//! - [`board`]: Board model, persistence ports, and orchestration services

pub mod board;
