//! # Admission Gate
//!
//! The admission-control core of a cluster workload scheduler: given a
//! candidate job, decide whether it may be queued, started, or granted
//! additional resources under a hierarchy of configurable consumption
//! limits.
//!
//! Two tightly coupled subsystems live here:
//!
//! - **Resource-vector arithmetic**: multi-dimensional quantities over
//!   processors, memory, swap, disk, and administrator-defined generic
//!   resources, with addition/subtraction against configured capacities,
//!   task-count and feasibility computations, normalization, and a string
//!   grammar for configuration and reporting.
//! - **Hierarchical limit checking**: soft/hard limits in active, idle,
//!   and system categories attached to users, groups, accounts, classes,
//!   QOS levels, partitions, fairshare-tree nodes, and virtual
//!   containers, with cross-credential nesting, QOS overrides, and
//!   most-specific-wins traversal.
//!
//! ## What this crate does not do
//!
//! Job lifecycle management, wire serialization of jobs, resource-manager
//! protocol adapters, node discovery, and scheduling *order* (priority,
//! backfill) are external collaborators. The core answers one question:
//! is this job, right now, admissible under limits?
//!
//! ## Sketch
//!
//! ```rust,ignore
//! use admission_gate::config::SchedulerConfig;
//! use admission_gate::core::{
//!     AdmissionController, CandidateJob, CategorySet, JobConsumption,
//!     PartitionId, ResourceVector, SchedulerState,
//! };
//!
//! let mut state = SchedulerState::new();
//! let request = ResourceVector::parse_spec("procs=2,mem=4096", &mut state.catalog)?;
//! let consumption = JobConsumption::derive(&request, 4, 3600, 4, false);
//!
//! let controller = AdmissionController::new(SchedulerConfig::default(), state);
//! let mut job = CandidateJob::new("job.17", consumption);
//! job.credentials.user = Some("steve".into());
//!
//! match controller.check_limits(&job, PartitionId::GLOBAL, CategorySet::ALL, now) {
//!     Ok(grant) => println!("admitted, {} more like it would fit", grant.remaining),
//!     Err(reason) => println!("rejected: {reason}"),
//! }
//! ```
//!
//! Checks are synchronous and run to completion within one scheduling
//! step. State sits behind a single read/write lock: checks read, the
//! accounting pass writes.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core engines: resource vectors, limit records, admission traversal.
pub mod core;
/// Configuration models for limit enforcement.
pub mod config;
/// Shared utilities.
pub mod util;
