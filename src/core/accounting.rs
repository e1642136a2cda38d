//! Usage accounting for jobs entering and leaving the tracked
//! populations.
//!
//! The accounting pass walks the same records the admission check reads —
//! credential pairs, the fairshare ancestor chain, and virtual-container
//! throttles — and applies the job's consumption with a positive count on
//! start (or queue) and a negative count on completion or removal. It runs
//! under the state write lock and never interleaves with an in-progress
//! check.

use std::collections::HashSet;

use crate::core::admission::AdmissionController;
use crate::core::catalog::ResourceCatalog;
use crate::core::credential::{CredentialKind, CredentialRegistry};
use crate::core::job::{CandidateJob, JobConsumption};
use crate::core::policy::{LimitCategory, PartitionId, PolicyDimension, UsageRecord};
use crate::core::resolver::{PRIMARY_KINDS, SECONDARY_KINDS};

/// Result of one accounting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageAdjustment {
    /// True when a decrement underflowed a slot carrying limits; usage
    /// was clamped to zero and the inconsistency logged.
    pub violation_detected: bool,
}

impl AdmissionController {
    /// Charge (positive `count`) or release (negative `count`) the job's
    /// consumption against every record the admission check would
    /// consult, at the global partition and, under per-partition
    /// scheduling, at the job's partition.
    pub fn apply_usage(
        &self,
        job: &CandidateJob,
        partition: PartitionId,
        category: LimitCategory,
        count: i64,
    ) -> UsageAdjustment {
        let mut state = self.state.write();
        let state = &mut *state;
        let scoped = if self.config.per_partition_scheduling {
            partition
        } else {
            PartitionId::GLOBAL
        };

        // Capture the QOS exemptions before mutable traversal begins.
        let exempt: HashSet<PolicyDimension> = job
            .credentials
            .qos
            .as_deref()
            .and_then(|name| state.credentials.credential(CredentialKind::Qos, name))
            .map(|c| c.limits.exempt.clone())
            .unwrap_or_default();

        let mut violation = false;

        for primary in PRIMARY_KINDS {
            for secondary in SECONDARY_KINDS {
                let partition_pair = secondary == CredentialKind::Partition;
                if partition_pair != (category == LimitCategory::System) {
                    continue;
                }
                let Some(record) = resolve_record_mut(
                    &mut state.credentials,
                    job,
                    partition,
                    primary,
                    secondary,
                    category,
                ) else {
                    continue;
                };
                violation |= adjust_record(
                    record,
                    &state.catalog,
                    &job.consumption,
                    count,
                    scoped,
                    &exempt,
                );
            }
        }

        if !state.fairshare.is_empty() {
            let leaf = job
                .fairshare
                .get(&partition)
                .or_else(|| job.fairshare.get(&job.requested_partition))
                .or_else(|| job.fairshare.get(&PartitionId::GLOBAL))
                .copied();
            if let Some(leaf) = leaf {
                for node_id in state.fairshare.chain(leaf) {
                    let Some(node) = state.fairshare.node_mut(node_id) else {
                        continue;
                    };
                    let Some(record) = node.limits.record_mut(category) else {
                        continue;
                    };
                    violation |= adjust_record(
                        record,
                        &state.catalog,
                        &job.consumption,
                        count,
                        scoped,
                        &exempt,
                    );
                }
            }
        }

        for vc_id in state.containers.throttled_lineage(&job.containers) {
            let Some(vc) = state.containers.container_mut(vc_id) else {
                continue;
            };
            let Some(limits) = vc.throttle.as_mut() else {
                continue;
            };
            let Some(record) = limits.record_mut(category) else {
                continue;
            };
            violation |= adjust_record(
                record,
                &state.catalog,
                &job.consumption,
                count,
                scoped,
                &exempt,
            );
        }

        if violation {
            tracing::warn!(
                "usage underflow clamped on limited slots while releasing job {} ({} accounting)",
                job.name,
                category
            );
        }

        UsageAdjustment {
            violation_detected: violation,
        }
    }

    /// Record one submission against a partition's rate guard.
    pub fn note_submission(&self, partition: PartitionId, now: u64) {
        let mut state = self.state.write();
        if let Some(guard) = state
            .credentials
            .partition_mut(partition)
            .and_then(|p| p.rate_guard.as_mut())
        {
            guard.record(now);
        }
    }
}

fn credential_name(job: &CandidateJob, kind: CredentialKind) -> Option<&str> {
    let creds = &job.credentials;
    match kind {
        CredentialKind::User => creds.user.as_deref(),
        CredentialKind::Group => creds.group.as_deref(),
        CredentialKind::Account => creds.account.as_deref(),
        CredentialKind::Class => creds.class.as_deref(),
        CredentialKind::Qos => creds.qos.as_deref(),
        CredentialKind::Partition => None,
    }
}

/// Mutable mirror of the resolver's lookup. Direct records are created on
/// demand so usage is tracked even on credentials without configured
/// limits; nested records are adjusted only where configured.
fn resolve_record_mut<'a>(
    registry: &'a mut CredentialRegistry,
    job: &CandidateJob,
    partition: PartitionId,
    primary: Option<CredentialKind>,
    secondary: CredentialKind,
    category: LimitCategory,
) -> Option<&'a mut UsageRecord> {
    if secondary == CredentialKind::Partition {
        if primary.is_some() {
            return None;
        }
        return registry.partition_mut(partition)?.limits.record_mut(category);
    }

    let name = credential_name(job, secondary)?;
    let qualifier = match primary {
        None => None,
        Some(kind) => Some((kind, credential_name(job, kind)?)),
    };
    let credential = registry.credential_mut(secondary, name)?;
    match qualifier {
        None => credential.limits.record_mut(category),
        Some((kind, qualifier_name)) => credential.limits.cross_mut(category, kind, qualifier_name),
    }
}

/// Apply the per-dimension deltas to one record.
fn adjust_record(
    record: &mut UsageRecord,
    catalog: &ResourceCatalog,
    delta: &JobConsumption,
    count: i64,
    scoped: PartitionId,
    exempt: &HashSet<PolicyDimension>,
) -> bool {
    let mut violation = false;

    for dimension in PolicyDimension::ALL {
        if exempt.contains(&dimension) {
            continue;
        }

        if dimension == PolicyDimension::MaxGres {
            if !record.has_gres_limits() || delta.gres.total() == 0 {
                continue;
            }
            for (idx, per_job) in delta.gres.iter() {
                let amount = count * per_job;
                if amount == 0 {
                    continue;
                }
                let Some(name) = catalog.name(idx) else {
                    continue;
                };
                if !record.gres_known(name) {
                    continue;
                }
                violation |= record.adjust_gres_usage(name, PartitionId::GLOBAL, amount);
                if scoped != PartitionId::GLOBAL {
                    violation |= record.adjust_gres_usage(name, scoped, amount);
                }
            }
        } else {
            let amount = count * delta.amount_for(dimension);
            if amount == 0 {
                continue;
            }
            violation |= record.adjust_usage(dimension, PartitionId::GLOBAL, amount);
            if scoped != PartitionId::GLOBAL {
                violation |= record.adjust_usage(dimension, scoped, amount);
            }
        }
    }

    violation
}
