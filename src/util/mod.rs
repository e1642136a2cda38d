//! Shared utilities.

pub mod memspec;
pub mod telemetry;

pub use memspec::*;
pub use telemetry::*;
