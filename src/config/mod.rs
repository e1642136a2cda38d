//! Configuration models for the admission core.

pub mod sched;

pub use sched::{SchedulerConfig, DEFAULT_TASKS_PER_NODE};
