//! Error types for admission decisions.

use std::fmt;

use thiserror::Error;

use crate::core::credential::CredentialKind;
use crate::core::policy::{LimitCategory, PolicyDimension, PolicyLevel};

/// Errors produced by the admission core.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Missing or malformed input; nothing was evaluated or mutated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The partition's resource manager is over its submission-rate window.
    #[error("job {job} violates maxjobperminute policy for partition {partition} (limit: {limit})")]
    SubmitRateExceeded {
        /// Rejected job.
        job: String,
        /// Partition whose guard tripped.
        partition: String,
        /// Configured jobs-per-minute ceiling.
        limit: u32,
    },
    /// The job's array has no free concurrency slot.
    #[error("job '{job}' violates array '{array}' slot limit of {limit}")]
    ArraySlotLimit {
        /// Rejected job.
        job: String,
        /// Array the job belongs to.
        array: String,
        /// Configured concurrent-member ceiling.
        limit: i64,
    },
    /// A configured consumption limit rejected the job.
    #[error("{0}")]
    PolicyViolation(Box<LimitViolation>),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

/// Where in the hierarchy a violated limit was attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationScope {
    /// A credential's own or cross-credential limit.
    Credential {
        /// Kind of the credential holding the limit.
        kind: CredentialKind,
        /// Name of the credential holding the limit.
        name: String,
        /// Cross-credential qualifier, when the limit was a nested
        /// per-other-credential entry.
        qualifier: Option<CredentialKind>,
    },
    /// A fairshare-tree ancestor's limit.
    Fairshare {
        /// Name of the tree node holding the limit.
        node: String,
    },
    /// A virtual container's throttle limit.
    Container {
        /// Name of the container holding the limit.
        name: String,
    },
}

/// A rejected limit check, with everything the diagnostic names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitViolation {
    /// Rejected job.
    pub job: String,
    /// Holder of the violated limit.
    pub scope: ViolationScope,
    /// Limit category that tripped.
    pub category: LimitCategory,
    /// Enforcement level in effect.
    pub level: PolicyLevel,
    /// Violated policy dimension.
    pub dimension: PolicyDimension,
    /// True when a QOS override supplied the effective limit.
    pub used_override: bool,
    /// Name of the partition the check ran against.
    pub partition: String,
    /// The effective limit value.
    pub limit: i64,
    /// The job's incremental consumption on this dimension.
    pub requested: i64,
    /// Usage already recorded against the limit holder.
    pub in_use: i64,
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.used_override { "QoS override " } else { "" };
        let dim = self.dimension.label(self.category);
        match &self.scope {
            ViolationScope::Credential {
                kind,
                name,
                qualifier,
            } => write!(
                f,
                "job {} violates {}{} {} {} limit of {} for {} {} {} partition {} (Req: {}  InUse: {})",
                self.job,
                prefix,
                self.category,
                self.level,
                dim,
                self.limit,
                kind.label(),
                name,
                qualifier.map_or("", CredentialKind::label),
                self.partition,
                self.requested,
                self.in_use,
            ),
            ViolationScope::Fairshare { node } => write!(
                f,
                "job {} violates {}{} {} {} limit of {} for fairshare node {} (Req: {}  InUse: {})",
                self.job,
                prefix,
                self.category,
                self.level,
                dim,
                self.limit,
                node,
                self.requested,
                self.in_use,
            ),
            ViolationScope::Container { name } => write!(
                f,
                "job {} violates {}{} {} {} limit of {} for virtual container {} (Req: {}  InUse: {})",
                self.job,
                prefix,
                self.category,
                self.level,
                dim,
                self.limit,
                name,
                self.requested,
                self.in_use,
            ),
        }
    }
}
