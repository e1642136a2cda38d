//! Resource-vector arithmetic and hierarchical limit checking.

pub mod accounting;
pub mod admission;
pub mod catalog;
pub mod credential;
pub mod error;
pub mod fairshare;
pub mod gres;
pub mod job;
pub mod policy;
pub mod resolver;
pub mod text;
pub mod vc;
pub mod vector;

pub use accounting::UsageAdjustment;
pub use admission::{
    Admitted, AdmissionController, SchedulerState, SharedState, MAX_JOB_ARRAY_SIZE,
};
pub use catalog::{GresIndex, ResourceCatalog};
pub use credential::{
    Credential, CredentialKind, CredentialLimitSet, CredentialRegistry, Partition, PrimaryScope,
    SubmitRateGuard,
};
pub use error::{AdmissionError, AppResult, LimitViolation, ViolationScope};
pub use fairshare::{FairshareNode, FairshareNodeId, FairshareTree};
pub use gres::GresVector;
pub use job::{ArraySlot, CandidateJob, JobConsumption, JobCredentials};
pub use policy::{
    check_dimension, CategorySet, DimensionOutcome, LimitCategory, LimitEntry, PartitionId,
    PolicyDimension, PolicyLevel, RecordSet, UsageRecord,
};
pub use resolver::{LimitResolver, ResolvedRecords, PRIMARY_KINDS, SECONDARY_KINDS};
pub use text::FormatMode;
pub use vc::{VcId, VcRegistry, VirtualContainer};
pub use vector::{
    DimensionMask, NegativeDimension, ResourceAmount, ResourceVector, ScalarDimension,
};
