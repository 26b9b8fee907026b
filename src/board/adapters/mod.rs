//! Adapter implementations for the board ports.

pub mod local;
pub mod memory;
