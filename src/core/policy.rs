//! Policy dimensions, limit records, and the single-dimension check.
//!
//! A [`UsageRecord`] is the per-credential ledger of configured soft/hard
//! limits and live usage, keyed by `(dimension, partition)`. The
//! [`check_dimension`] primitive evaluates one policy dimension of one
//! record set against a job's incremental consumption; every traversal in
//! the admission layer bottoms out here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::catalog::ResourceCatalog;
use crate::core::job::JobConsumption;

/// Enforcement level selected by scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyLevel {
    /// Limit enforcement disabled; every job passes.
    Off,
    /// Soft limits are the active tier.
    Soft,
    /// Hard limits are the active tier.
    Hard,
}

impl std::fmt::Display for PolicyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Off => "OFF",
            Self::Soft => "SOFT",
            Self::Hard => "HARD",
        })
    }
}

/// Which workload population a limit constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitCategory {
    /// Running workload.
    Active,
    /// Queued, not-yet-started workload.
    Idle,
    /// Globally tracked workload.
    System,
}

impl LimitCategory {
    /// All categories in evaluation order.
    pub const ALL: [Self; 3] = [Self::Active, Self::Idle, Self::System];
}

impl std::fmt::Display for LimitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::System => "system",
        })
    }
}

/// Selection of limit categories for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySet {
    /// Evaluate active limits.
    pub active: bool,
    /// Evaluate idle limits.
    pub idle: bool,
    /// Evaluate system limits.
    pub system: bool,
}

impl CategorySet {
    /// Every category.
    pub const ALL: Self = Self {
        active: true,
        idle: true,
        system: true,
    };

    /// Active limits only.
    pub const ACTIVE: Self = Self {
        active: true,
        idle: false,
        system: false,
    };

    /// True when the set includes the category.
    #[must_use]
    pub const fn contains(self, category: LimitCategory) -> bool {
        match category {
            LimitCategory::Active => self.active,
            LimitCategory::Idle => self.idle,
            LimitCategory::System => self.system,
        }
    }
}

/// Scheduling-domain subdivision index. Index 0 is the global "all
/// partitions" domain and is checked unconditionally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PartitionId(pub usize);

impl PartitionId {
    /// The global partition.
    pub const GLOBAL: Self = Self(0);
}

/// A throttling policy dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyDimension {
    /// Concurrent job count.
    MaxJob,
    /// Dedicated processor count.
    MaxProc,
    /// Allocated node count.
    MaxNode,
    /// Processor-seconds.
    MaxPs,
    /// Processor-equivalent count.
    MaxPe,
    /// Aggregate walltime.
    MaxWc,
    /// Processor floor: jobs must keep usage at or above the limit.
    MinProc,
    /// Dedicated memory, MB.
    MaxMem,
    /// Generic-resource counts, checked per demanded resource name.
    MaxGres,
    /// Concurrent array-member count.
    MaxArrayJob,
}

impl PolicyDimension {
    /// All dimensions in evaluation order.
    pub const ALL: [Self; 10] = [
        Self::MaxJob,
        Self::MaxProc,
        Self::MaxNode,
        Self::MaxPs,
        Self::MaxPe,
        Self::MaxWc,
        Self::MinProc,
        Self::MaxMem,
        Self::MaxGres,
        Self::MaxArrayJob,
    ];

    /// Diagnostic name; idle-category limits carry their own spellings.
    #[must_use]
    pub const fn label(self, category: LimitCategory) -> &'static str {
        match (self, category) {
            (Self::MaxJob, LimitCategory::Idle) => "MAXIJOB",
            (Self::MaxJob, _) => "MAXJOB",
            (Self::MaxProc, LimitCategory::Idle) => "MAXIPROC",
            (Self::MaxProc, _) => "MAXPROC",
            (Self::MaxNode, LimitCategory::Idle) => "MAXINODE",
            (Self::MaxNode, _) => "MAXNODE",
            (Self::MaxPs, LimitCategory::Idle) => "MAXIPS",
            (Self::MaxPs, _) => "MAXPS",
            (Self::MaxPe, LimitCategory::Idle) => "MAXIPE",
            (Self::MaxPe, _) => "MAXPE",
            (Self::MaxWc, LimitCategory::Idle) => "MAXIWC",
            (Self::MaxWc, _) => "MAXWC",
            (Self::MinProc, LimitCategory::Idle) => "MINIPROC",
            (Self::MinProc, _) => "MINPROC",
            (Self::MaxMem, LimitCategory::Idle) => "MAXIMEM",
            (Self::MaxMem, _) => "MAXMEM",
            (Self::MaxGres, LimitCategory::Idle) => "MAXIGRES",
            (Self::MaxGres, _) => "MAXGRES",
            (Self::MaxArrayJob, LimitCategory::Idle) => "MAXIARRAYJOB",
            (Self::MaxArrayJob, _) => "MAXARRAYJOB",
        }
    }
}

/// Soft/hard limit tiers and live usage for one `(dimension, partition)`
/// slot. A missing limit means "unconstrained"; an explicit zero blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitEntry {
    /// Soft-tier limit.
    pub soft: Option<i64>,
    /// Hard-tier limit.
    pub hard: Option<i64>,
    /// Usage currently charged against this slot.
    pub usage: i64,
}

impl LimitEntry {
    /// The limit tier selected by the enforcement level. Soft enforcement
    /// falls back to the hard tier when no soft limit is set.
    #[must_use]
    pub fn limit_for(&self, level: PolicyLevel) -> Option<i64> {
        match level {
            PolicyLevel::Soft => self.soft.or(self.hard),
            _ => self.hard,
        }
    }
}

/// Per-credential soft/hard limits and live usage across every policy
/// dimension and partition, plus per-name generic-resource slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageRecord {
    entries: HashMap<(PolicyDimension, PartitionId), LimitEntry>,
    gres: HashMap<String, HashMap<PartitionId, LimitEntry>>,
}

impl UsageRecord {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no slot has been touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.gres.is_empty()
    }

    /// Entry at a slot, if present.
    #[must_use]
    pub fn entry(&self, dimension: PolicyDimension, partition: PartitionId) -> Option<&LimitEntry> {
        self.entries.get(&(dimension, partition))
    }

    /// Mutable entry at a slot, created on demand.
    pub fn entry_mut(
        &mut self,
        dimension: PolicyDimension,
        partition: PartitionId,
    ) -> &mut LimitEntry {
        self.entries.entry((dimension, partition)).or_default()
    }

    /// True when a hard limit is configured at the slot. Drives the
    /// object-before-default resolution precedence.
    #[must_use]
    pub fn has_limit(&self, dimension: PolicyDimension, partition: PartitionId) -> bool {
        self.entry(dimension, partition)
            .is_some_and(|e| e.hard.is_some())
    }

    /// Limit selected by the enforcement level at a slot.
    #[must_use]
    pub fn limit_for(
        &self,
        dimension: PolicyDimension,
        partition: PartitionId,
        level: PolicyLevel,
    ) -> Option<i64> {
        self.entry(dimension, partition)
            .and_then(|e| e.limit_for(level))
    }

    /// Usage charged at a slot.
    #[must_use]
    pub fn usage(&self, dimension: PolicyDimension, partition: PartitionId) -> i64 {
        self.entry(dimension, partition).map_or(0, |e| e.usage)
    }

    /// Set both limit tiers at a slot.
    pub fn set_limits(
        &mut self,
        dimension: PolicyDimension,
        partition: PartitionId,
        soft: Option<i64>,
        hard: Option<i64>,
    ) {
        let entry = self.entry_mut(dimension, partition);
        entry.soft = soft;
        entry.hard = hard;
    }

    /// Set the hard limit at a slot.
    pub fn set_hard_limit(
        &mut self,
        dimension: PolicyDimension,
        partition: PartitionId,
        limit: i64,
    ) {
        self.entry_mut(dimension, partition).hard = Some(limit);
    }

    /// Set the soft limit at a slot.
    pub fn set_soft_limit(
        &mut self,
        dimension: PolicyDimension,
        partition: PartitionId,
        limit: i64,
    ) {
        self.entry_mut(dimension, partition).soft = Some(limit);
    }

    /// Overwrite usage at a slot.
    pub fn set_usage(&mut self, dimension: PolicyDimension, partition: PartitionId, usage: i64) {
        self.entry_mut(dimension, partition).usage = usage;
    }

    /// Apply a usage delta at a slot, clamping underflow to zero.
    ///
    /// Returns true when the clamp fired on a slot that carries limits,
    /// which callers treat as a detected accounting violation.
    pub fn adjust_usage(
        &mut self,
        dimension: PolicyDimension,
        partition: PartitionId,
        delta: i64,
    ) -> bool {
        let entry = self.entry_mut(dimension, partition);
        if entry.usage + delta < 0 {
            entry.usage = 0;
            entry.soft.unwrap_or(0) > 0 || entry.hard.unwrap_or(0) > 0
        } else {
            entry.usage += delta;
            false
        }
    }

    /// True when any per-name generic-resource slot exists.
    #[must_use]
    pub fn has_gres_limits(&self) -> bool {
        !self.gres.is_empty()
    }

    /// True when the record tracks the named generic resource at all.
    #[must_use]
    pub fn gres_known(&self, name: &str) -> bool {
        self.gres.contains_key(name)
    }

    /// Per-name generic-resource entry at a partition, if present.
    #[must_use]
    pub fn gres_entry(&self, name: &str, partition: PartitionId) -> Option<&LimitEntry> {
        self.gres.get(name).and_then(|slots| slots.get(&partition))
    }

    /// Mutable per-name generic-resource entry, created on demand.
    pub fn gres_entry_mut(&mut self, name: &str, partition: PartitionId) -> &mut LimitEntry {
        self.gres
            .entry(name.to_string())
            .or_default()
            .entry(partition)
            .or_default()
    }

    /// Usage charged against a named generic resource at a partition.
    #[must_use]
    pub fn gres_usage(&self, name: &str, partition: PartitionId) -> i64 {
        self.gres_entry(name, partition).map_or(0, |e| e.usage)
    }

    /// Apply a usage delta to a named generic resource, clamping underflow
    /// to zero. Same violation contract as [`UsageRecord::adjust_usage`].
    pub fn adjust_gres_usage(&mut self, name: &str, partition: PartitionId, delta: i64) -> bool {
        let entry = self.gres_entry_mut(name, partition);
        if entry.usage + delta < 0 {
            entry.usage = 0;
            entry.soft.unwrap_or(0) > 0 || entry.hard.unwrap_or(0) > 0
        } else {
            entry.usage += delta;
            false
        }
    }
}

/// The records resolved for one evaluation: the credential's own (or
/// cross-credential) record, the scheduler-default fallback, and the QOS
/// override when applicable.
///
/// Resolution precedence inside the check is override → object → default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordSet<'a> {
    /// The credential's own record; its usage is always the baseline.
    pub record: Option<&'a UsageRecord>,
    /// Default-credential record consulted when the object sets no limit.
    pub fallback: Option<&'a UsageRecord>,
    /// QOS override record; replaces the selected limit when it binds the
    /// dimension.
    pub qos_override: Option<&'a UsageRecord>,
}

/// Outcome of a single-dimension evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionOutcome {
    /// Within limits.
    Pass {
        /// The effective limit, when one was set.
        limit: Option<i64>,
        /// True when a QOS override was consulted.
        used_override: bool,
    },
    /// Limit exceeded, or floor unmet for [`PolicyDimension::MinProc`].
    Fail {
        /// The effective limit.
        limit: i64,
        /// Usage already charged to the record, excluding the job.
        in_use: i64,
        /// True when a QOS override supplied the limit.
        used_override: bool,
    },
}

impl DimensionOutcome {
    /// True for the pass variant.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }
}

/// Evaluate one policy dimension of one record set against a job's
/// incremental consumption.
///
/// The effective limit comes from the object record when it sets a hard
/// limit at the slot, else from the fallback record; a QOS override that
/// binds the dimension replaces it (unless the selected limit is an
/// explicit zero and `always_apply_override` is off). An unset limit
/// passes unconditionally. `MinProc` inverts polarity: combined usage must
/// reach the limit. On a pass with a capped dimension, `remaining` is
/// lowered to the number of further identical jobs the tightest limit
/// still admits.
#[must_use]
pub fn check_dimension(
    delta: &JobConsumption,
    dimension: PolicyDimension,
    level: PolicyLevel,
    partition: PartitionId,
    records: &RecordSet<'_>,
    catalog: &ResourceCatalog,
    always_apply_override: bool,
    remaining: Option<&mut i64>,
) -> DimensionOutcome {
    if dimension == PolicyDimension::MaxGres {
        return check_gres_dimension(delta, level, partition, records, catalog, remaining);
    }

    let mut used_override = false;

    let mut limit = records
        .record
        .filter(|r| r.has_limit(dimension, partition))
        .and_then(|r| r.limit_for(dimension, partition, level));
    if limit.is_none() {
        limit = records
            .fallback
            .filter(|r| r.has_limit(dimension, partition))
            .and_then(|r| r.limit_for(dimension, partition, level));
    }

    if let Some(qos) = records.qos_override {
        if qos.has_limit(dimension, partition) {
            used_override = true;
            if always_apply_override || limit != Some(0) {
                limit = qos.limit_for(dimension, partition, level);
            }
        }
    }

    let Some(limit) = limit else {
        return DimensionOutcome::Pass {
            limit: None,
            used_override,
        };
    };

    let requested = delta.amount_for(dimension);
    if requested == 0 {
        // A job that adds nothing to the dimension cannot violate it.
        return DimensionOutcome::Pass {
            limit: Some(limit),
            used_override,
        };
    }
    let in_use = records.record.map_or(0, |r| r.usage(dimension, partition));
    let combined = requested + in_use;

    if dimension == PolicyDimension::MinProc {
        // Floor semantics: the credential must hold at least this many.
        if combined < limit {
            return DimensionOutcome::Fail {
                limit,
                in_use,
                used_override,
            };
        }
        return DimensionOutcome::Pass {
            limit: Some(limit),
            used_override,
        };
    }

    if combined > limit {
        if let Some(rem) = remaining {
            *rem = 0;
        }
        return DimensionOutcome::Fail {
            limit,
            in_use,
            used_override,
        };
    }

    if let Some(rem) = remaining {
        if requested > 0 {
            *rem = (*rem).min((limit - combined) / requested);
        }
    }

    DimensionOutcome::Pass {
        limit: Some(limit),
        used_override,
    }
}

/// Generic-resource arm of [`check_dimension`]: every resource the job
/// demands is checked against the per-name slots, with the same
/// object → default precedence and QOS override replacement.
fn check_gres_dimension(
    delta: &JobConsumption,
    level: PolicyLevel,
    partition: PartitionId,
    records: &RecordSet<'_>,
    catalog: &ResourceCatalog,
    mut remaining: Option<&mut i64>,
) -> DimensionOutcome {
    let mut used_override = false;
    let mut effective: Option<i64> = None;

    for (idx, requested) in delta.gres.iter() {
        let Some(name) = catalog.name(idx) else {
            continue;
        };

        // Presence of a per-name slot on the object short-circuits the
        // default, even when the slot leaves the active tier unset.
        let mut limit = match records.record.and_then(|r| r.gres_entry(name, partition)) {
            Some(entry) => entry.limit_for(level),
            None => records
                .fallback
                .and_then(|r| r.gres_entry(name, partition))
                .and_then(|e| e.limit_for(level)),
        };

        if let Some(entry) = records
            .qos_override
            .and_then(|r| r.gres_entry(name, partition))
        {
            limit = entry.limit_for(level);
            used_override = true;
        }

        let in_use = records
            .record
            .map_or(0, |r| r.gres_usage(name, partition));
        let combined = requested + in_use;

        if let Some(limit) = limit {
            effective = Some(limit);
            if combined > limit {
                if let Some(rem) = remaining {
                    *rem = 0;
                }
                return DimensionOutcome::Fail {
                    limit,
                    in_use,
                    used_override,
                };
            }
            if let Some(rem) = remaining.as_deref_mut() {
                if requested > 0 {
                    *rem = (*rem).min((limit - combined) / requested);
                }
            }
        }
    }

    DimensionOutcome::Pass {
        limit: effective,
        used_override,
    }
}
