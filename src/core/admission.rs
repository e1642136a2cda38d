//! Full admission check for one candidate job.
//!
//! [`AdmissionController::check_limits`] decides whether a job may proceed
//! under every configured consumption limit: the credential hierarchy, the
//! fairshare-tree ancestry, and virtual-container throttles. The first
//! violation aborts the check with a diagnostic; a pass reports how many
//! more identical jobs the tightest limit still admits.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::SchedulerConfig;
use crate::core::catalog::ResourceCatalog;
use crate::core::credential::{CredentialKind, CredentialRegistry};
use crate::core::error::{AdmissionError, LimitViolation, ViolationScope};
use crate::core::fairshare::FairshareTree;
use crate::core::job::CandidateJob;
use crate::core::policy::{
    check_dimension, CategorySet, DimensionOutcome, LimitCategory, PartitionId, PolicyDimension,
    PolicyLevel, RecordSet,
};
use crate::core::resolver::{LimitResolver, PRIMARY_KINDS, SECONDARY_KINDS};
use crate::core::vc::VcRegistry;

/// Ceiling for the remaining-capacity estimate, matching the largest
/// supported job array.
pub const MAX_JOB_ARRAY_SIZE: i64 = 100_000;

/// Everything the admission check reads: the generic-resource catalog,
/// the credential registry, the fairshare tree, and the virtual-container
/// registry.
#[derive(Debug, Default)]
pub struct SchedulerState {
    /// Generic-resource name registry.
    pub catalog: ResourceCatalog,
    /// Credentials, defaults, and partitions.
    pub credentials: CredentialRegistry,
    /// Fairshare-usage tree.
    pub fairshare: FairshareTree,
    /// Virtual containers.
    pub containers: VcRegistry,
}

impl SchedulerState {
    /// Empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shared, lock-guarded scheduler state. Checks take the read side; the
/// accounting pass takes the write side.
pub type SharedState = Arc<RwLock<SchedulerState>>;

/// A successful admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admitted {
    /// How many more jobs identical to this one the tightest observed
    /// limit would still admit. Only meaningful at this instant.
    pub remaining: i64,
}

/// A failed single-dimension evaluation, carrying what the diagnostic
/// needs.
struct FailInfo {
    partition: PartitionId,
    limit: i64,
    in_use: i64,
    used_override: bool,
}

/// Orchestrates limit checks for candidate jobs.
pub struct AdmissionController {
    pub(crate) config: SchedulerConfig,
    pub(crate) state: SharedState,
}

impl AdmissionController {
    /// Controller owning fresh shared state.
    #[must_use]
    pub fn new(config: SchedulerConfig, state: SchedulerState) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Controller over externally shared state.
    #[must_use]
    pub fn with_shared(config: SchedulerConfig, state: SharedState) -> Self {
        Self { config, state }
    }

    /// Handle to the shared state.
    #[must_use]
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Verify the job satisfies all limits for the partition and the
    /// requested limit categories at time `now`.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvalidArgument`] for an unknown partition;
    /// [`AdmissionError::SubmitRateExceeded`],
    /// [`AdmissionError::ArraySlotLimit`], or
    /// [`AdmissionError::PolicyViolation`] when a guard or limit rejects
    /// the job.
    pub fn check_limits(
        &self,
        job: &CandidateJob,
        partition: PartitionId,
        categories: CategorySet,
        now: u64,
    ) -> Result<Admitted, AdmissionError> {
        let state = self.state.read();

        let Some(par) = state.credentials.partition(partition) else {
            return Err(AdmissionError::InvalidArgument(format!(
                "unknown partition index {}",
                partition.0
            )));
        };

        // The submission-rate guard applies even when policies are off.
        if let Some(guard) = &par.rate_guard {
            if guard.saturated(now) {
                return Err(AdmissionError::SubmitRateExceeded {
                    job: job.name.clone(),
                    partition: par.name.clone(),
                    limit: guard.max_per_minute,
                });
            }
        }

        if self.config.policy_level == PolicyLevel::Off || job.ignore_policies {
            return Ok(Admitted {
                remaining: MAX_JOB_ARRAY_SIZE,
            });
        }

        let mut remaining = MAX_JOB_ARRAY_SIZE;

        if categories.active {
            if let Some(array) = &job.array {
                if array.limit > 0 && array.active >= array.limit {
                    return Err(AdmissionError::ArraySlotLimit {
                        job: job.name.clone(),
                        array: array.name.clone(),
                        limit: array.limit,
                    });
                }
            }
        }

        self.check_credential_limits(&state, job, partition, categories, &mut remaining)?;
        self.check_fairshare_limits(&state, job, partition, categories, &mut remaining)?;
        if !job.containers.is_empty() {
            self.check_vc_limits(&state, job, partition, categories, &mut remaining)?;
        }

        Ok(Admitted { remaining })
    }

    /// [`AdmissionController::check_limits`] with the scheduler-iteration
    /// defaults: all categories, pruned to active-only when the job was
    /// already found eligible this iteration.
    ///
    /// # Errors
    ///
    /// Same as [`AdmissionController::check_limits`].
    pub fn check_policies(
        &self,
        job: &CandidateJob,
        partition: PartitionId,
        categories: Option<CategorySet>,
        now: u64,
    ) -> Result<Admitted, AdmissionError> {
        let mut categories = categories.unwrap_or(CategorySet::ALL);
        if job.is_eligible {
            categories.idle = false;
            categories.system = false;
        }
        self.check_limits(job, partition, categories, now)
    }

    /// The partition a dimension additionally checks against, beyond the
    /// global one.
    fn scoped_partition(&self, partition: PartitionId) -> PartitionId {
        if self.config.per_partition_scheduling {
            partition
        } else {
            PartitionId::GLOBAL
        }
    }

    /// Evaluate one dimension at the global partition and, when
    /// per-partition scheduling applies, at the job's partition. The
    /// remaining-capacity bound tightens on the global evaluation only.
    fn eval_dimension(
        &self,
        state: &SchedulerState,
        job: &CandidateJob,
        dimension: PolicyDimension,
        records: &RecordSet<'_>,
        scoped: PartitionId,
        remaining: &mut i64,
    ) -> Result<(), FailInfo> {
        let level = self.config.policy_level;
        let force = self.config.always_apply_qos_override;

        match check_dimension(
            &job.consumption,
            dimension,
            level,
            PartitionId::GLOBAL,
            records,
            &state.catalog,
            force,
            Some(remaining),
        ) {
            DimensionOutcome::Fail {
                limit,
                in_use,
                used_override,
            } => {
                return Err(FailInfo {
                    partition: PartitionId::GLOBAL,
                    limit,
                    in_use,
                    used_override,
                });
            }
            DimensionOutcome::Pass { .. } => {}
        }

        if scoped != PartitionId::GLOBAL {
            if let DimensionOutcome::Fail {
                limit,
                in_use,
                used_override,
            } = check_dimension(
                &job.consumption,
                dimension,
                level,
                scoped,
                records,
                &state.catalog,
                force,
                None,
            ) {
                return Err(FailInfo {
                    partition: scoped,
                    limit,
                    in_use,
                    used_override,
                });
            }
        }

        Ok(())
    }

    fn violation(
        &self,
        state: &SchedulerState,
        job: &CandidateJob,
        scope: ViolationScope,
        category: LimitCategory,
        dimension: PolicyDimension,
        fail: &FailInfo,
    ) -> AdmissionError {
        let violation = LimitViolation {
            job: job.name.clone(),
            scope,
            category,
            level: self.config.policy_level,
            dimension,
            used_override: fail.used_override,
            partition: state.credentials.partition_name(fail.partition).to_string(),
            limit: fail.limit,
            requested: job.consumption.amount_for(dimension),
            in_use: fail.in_use,
        };
        tracing::info!("{violation}");
        AdmissionError::PolicyViolation(Box::new(violation))
    }

    /// Credential limits: every ordered (primary, secondary) kind pair,
    /// every requested category, every dimension not exempted by the
    /// job's QOS.
    fn check_credential_limits(
        &self,
        state: &SchedulerState,
        job: &CandidateJob,
        partition: PartitionId,
        categories: CategorySet,
        remaining: &mut i64,
    ) -> Result<(), AdmissionError> {
        let resolver = LimitResolver::new(&state.credentials, job, partition);
        let scoped = self.scoped_partition(partition);

        for category in LimitCategory::ALL {
            if !categories.contains(category) {
                continue;
            }
            for primary in PRIMARY_KINDS {
                for secondary in SECONDARY_KINDS {
                    // Partition limits live in the system category; every
                    // other kind stays out of it.
                    let partition_pair = secondary == CredentialKind::Partition;
                    if partition_pair != (category == LimitCategory::System) {
                        continue;
                    }

                    let Some(resolved) = resolver.resolve(primary, secondary, category) else {
                        continue;
                    };

                    for dimension in PolicyDimension::ALL {
                        if resolver.is_exempt(dimension) {
                            continue;
                        }
                        if let Err(fail) = self.eval_dimension(
                            state,
                            job,
                            dimension,
                            &resolved.records,
                            scoped,
                            remaining,
                        ) {
                            return Err(self.violation(
                                state,
                                job,
                                ViolationScope::Credential {
                                    kind: resolved.kind,
                                    name: resolved.name.to_string(),
                                    qualifier: resolved.qualifier,
                                },
                                category,
                                dimension,
                                &fail,
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Fairshare-tree limits along the ancestor chain of the job's most
    /// specific tree node. With the most-specific-limit flag set, a
    /// dimension that passed at an ancestor holding a nonzero limit is
    /// not re-evaluated at less specific ancestors.
    fn check_fairshare_limits(
        &self,
        state: &SchedulerState,
        job: &CandidateJob,
        partition: PartitionId,
        categories: CategorySet,
        remaining: &mut i64,
    ) -> Result<(), AdmissionError> {
        if state.fairshare.is_empty() {
            return Ok(());
        }

        // Most specific leaf available: the evaluated partition, then the
        // partition the job asked for, then the global entry.
        let leaf = job
            .fairshare
            .get(&partition)
            .or_else(|| job.fairshare.get(&job.requested_partition))
            .or_else(|| job.fairshare.get(&PartitionId::GLOBAL));
        let Some(leaf) = leaf else {
            return Ok(());
        };
        let chain = state.fairshare.chain(*leaf);

        let resolver = LimitResolver::new(&state.credentials, job, partition);

        for category in LimitCategory::ALL {
            if !categories.contains(category) {
                continue;
            }
            let qos_override = resolver.qos_override(category);
            let mut settled = [false; PolicyDimension::ALL.len()];

            for node_id in &chain {
                let Some(node) = state.fairshare.node(*node_id) else {
                    continue;
                };
                let Some(record) = node.limits.record(category) else {
                    continue;
                };
                let records = RecordSet {
                    record: Some(record),
                    fallback: None,
                    qos_override,
                };

                for (slot, dimension) in PolicyDimension::ALL.into_iter().enumerate() {
                    if self.config.most_specific_limit && settled[slot] {
                        continue;
                    }
                    match check_dimension(
                        &job.consumption,
                        dimension,
                        self.config.policy_level,
                        PartitionId::GLOBAL,
                        &records,
                        &state.catalog,
                        self.config.always_apply_qos_override,
                        Some(&mut *remaining),
                    ) {
                        DimensionOutcome::Fail {
                            limit,
                            in_use,
                            used_override,
                        } => {
                            return Err(self.violation(
                                state,
                                job,
                                ViolationScope::Fairshare {
                                    node: node.name.clone(),
                                },
                                category,
                                dimension,
                                &FailInfo {
                                    partition: PartitionId::GLOBAL,
                                    limit,
                                    in_use,
                                    used_override,
                                },
                            ));
                        }
                        DimensionOutcome::Pass { limit, .. } => {
                            // A set, nonzero limit settles the dimension at
                            // this specificity.
                            if limit.is_some_and(|l| l != 0) {
                                settled[slot] = true;
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Virtual-container throttle limits over the job's memberships and
    /// their ancestors. Every throttle-carrying container is evaluated;
    /// there is no most-specific short-circuit.
    fn check_vc_limits(
        &self,
        state: &SchedulerState,
        job: &CandidateJob,
        partition: PartitionId,
        categories: CategorySet,
        remaining: &mut i64,
    ) -> Result<(), AdmissionError> {
        let lineage = state.containers.throttled_lineage(&job.containers);
        if lineage.is_empty() {
            return Ok(());
        }

        let resolver = LimitResolver::new(&state.credentials, job, partition);

        for category in LimitCategory::ALL {
            if !categories.contains(category) {
                continue;
            }
            let qos_override = resolver.qos_override(category);

            for vc_id in &lineage {
                let Some(vc) = state.containers.container(*vc_id) else {
                    continue;
                };
                let Some(limits) = &vc.throttle else {
                    continue;
                };
                let Some(record) = limits.record(category) else {
                    continue;
                };
                let records = RecordSet {
                    record: Some(record),
                    fallback: None,
                    qos_override,
                };

                for dimension in PolicyDimension::ALL {
                    if let DimensionOutcome::Fail {
                        limit,
                        in_use,
                        used_override,
                    } = check_dimension(
                        &job.consumption,
                        dimension,
                        self.config.policy_level,
                        PartitionId::GLOBAL,
                        &records,
                        &state.catalog,
                        self.config.always_apply_qos_override,
                        Some(&mut *remaining),
                    ) {
                        return Err(self.violation(
                            state,
                            job,
                            ViolationScope::Container {
                                name: vc.name.clone(),
                            },
                            category,
                            dimension,
                            &FailInfo {
                                partition: PartitionId::GLOBAL,
                                limit,
                                in_use,
                                used_override,
                            },
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
