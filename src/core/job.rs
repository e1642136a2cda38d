//! Job consumption derivation and the candidate-job view.

use std::collections::HashMap;

use crate::core::fairshare::FairshareNodeId;
use crate::core::gres::GresVector;
use crate::core::policy::{PartitionId, PolicyDimension};
use crate::core::vc::VcId;
use crate::core::vector::ResourceVector;

/// What one job adds to each policy dimension if admitted.
///
/// Derived at check time from the job's request, never stored on the job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobConsumption {
    /// Job count; one for a real job.
    pub jobs: i64,
    /// Array-member count; one when the job belongs to an array.
    pub array_jobs: i64,
    /// Allocated or projected node count.
    pub nodes: i64,
    /// Processor-equivalent count.
    pub pe: i64,
    /// Dedicated processor count.
    pub procs: i64,
    /// Processor-seconds over the job's walltime.
    pub proc_seconds: i64,
    /// Requested walltime, seconds.
    pub walltime: i64,
    /// Dedicated memory per task, MB.
    pub mem: i64,
    /// Total generic-resource demand.
    pub gres: GresVector,
}

impl JobConsumption {
    /// Derive consumption from a per-task request.
    ///
    /// Processor, processor-second, and generic-resource totals scale by
    /// the task count; memory stays the per-task dedication. The node
    /// count is projected from the per-node task cap; callers that know
    /// the real allocation override it with
    /// [`JobConsumption::with_nodes`]. The processor-equivalent defaults
    /// to the processor count and is overridable the same way.
    #[must_use]
    pub fn derive(
        request: &ResourceVector,
        task_count: i64,
        walltime: i64,
        tasks_per_node: i64,
        is_array_member: bool,
    ) -> Self {
        let procs = request.procs.or_zero() * task_count;
        let nodes = (task_count / tasks_per_node.max(1)).max(1);
        Self {
            jobs: 1,
            array_jobs: i64::from(is_array_member),
            nodes,
            pe: procs,
            procs,
            proc_seconds: procs * walltime,
            walltime,
            mem: request.mem.or_zero(),
            gres: request.gres.scaled(task_count),
        }
    }

    /// Override the projected node count with a known allocation.
    #[must_use]
    pub fn with_nodes(mut self, nodes: i64) -> Self {
        self.nodes = nodes;
        self
    }

    /// Override the processor-equivalent count.
    #[must_use]
    pub fn with_pe(mut self, pe: i64) -> Self {
        self.pe = pe;
        self
    }

    /// Consumption charged against a policy dimension. Generic resources
    /// report their aggregate total; the per-name breakdown stays in
    /// [`JobConsumption::gres`].
    #[must_use]
    pub fn amount_for(&self, dimension: PolicyDimension) -> i64 {
        match dimension {
            PolicyDimension::MaxJob => self.jobs,
            PolicyDimension::MaxArrayJob => self.array_jobs,
            PolicyDimension::MaxNode => self.nodes,
            PolicyDimension::MaxPe => self.pe,
            PolicyDimension::MaxProc | PolicyDimension::MinProc => self.procs,
            PolicyDimension::MaxPs => self.proc_seconds,
            PolicyDimension::MaxWc => self.walltime,
            PolicyDimension::MaxMem => self.mem,
            PolicyDimension::MaxGres => self.gres.total(),
        }
    }
}

/// Credential chain a job runs under. Absent entries simply skip their
/// checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCredentials {
    /// Submitting user.
    pub user: Option<String>,
    /// Submitting group.
    pub group: Option<String>,
    /// Charge account.
    pub account: Option<String>,
    /// Class / queue.
    pub class: Option<String>,
    /// Quality-of-service level.
    pub qos: Option<String>,
}

/// Array membership as seen at admission time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArraySlot {
    /// Array name.
    pub name: String,
    /// Members currently active.
    pub active: i64,
    /// Concurrency ceiling; zero means unlimited.
    pub limit: i64,
}

/// Read-only view of one candidate job, carrying exactly what the
/// admission check consumes.
#[derive(Debug, Clone, Default)]
pub struct CandidateJob {
    /// Job name, used in diagnostics.
    pub name: String,
    /// Credential chain.
    pub credentials: JobCredentials,
    /// Partition the job asked for, used for fairshare-leaf fallback.
    pub requested_partition: PartitionId,
    /// Bypass every policy check when set.
    pub ignore_policies: bool,
    /// Already deemed eligible this iteration; idle and system limits
    /// need no re-evaluation.
    pub is_eligible: bool,
    /// Array membership, when the job is an array member.
    pub array: Option<ArraySlot>,
    /// Derived per-dimension consumption.
    pub consumption: JobConsumption,
    /// Fairshare leaf per partition; the global entry is the fallback.
    pub fairshare: HashMap<PartitionId, FairshareNodeId>,
    /// Virtual containers the job belongs to.
    pub containers: Vec<VcId>,
}

impl CandidateJob {
    /// View with a name and derived consumption; remaining fields start
    /// empty.
    #[must_use]
    pub fn new(name: impl Into<String>, consumption: JobConsumption) -> Self {
        Self {
            name: name.into(),
            consumption,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::GresIndex;

    #[test]
    fn test_derive_scales_by_task_count() {
        let mut request = ResourceVector::fixed(2, 1024, 0, 0);
        request.gres.set_count(GresIndex(1), 1);
        let c = JobConsumption::derive(&request, 4, 3600, 4, false);
        assert_eq!(c.jobs, 1);
        assert_eq!(c.procs, 8);
        assert_eq!(c.proc_seconds, 8 * 3600);
        assert_eq!(c.walltime, 3600);
        assert_eq!(c.mem, 1024);
        assert_eq!(c.nodes, 1);
        assert_eq!(c.pe, 8);
        assert_eq!(c.gres.count(GresIndex(1)), 4);
        assert_eq!(c.array_jobs, 0);
    }

    #[test]
    fn test_derive_projects_nodes_from_task_cap() {
        let request = ResourceVector::fixed(1, 0, 0, 0);
        let c = JobConsumption::derive(&request, 9, 60, 4, true);
        assert_eq!(c.nodes, 2);
        assert_eq!(c.array_jobs, 1);
        assert_eq!(c.with_nodes(5).nodes, 5);
    }
}
