//! Step definitions for board behaviour scenarios.

pub mod given;
pub mod then;
pub mod world;
