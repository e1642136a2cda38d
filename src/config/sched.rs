//! Scheduler configuration flags consumed by the admission core.

use serde::{Deserialize, Serialize};

use crate::core::policy::PolicyLevel;

/// Default per-node task cap seeding task-count computations.
pub const DEFAULT_TASKS_PER_NODE: i64 = 4;

/// Flags controlling limit evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Enforcement level; `off` admits everything.
    pub policy_level: PolicyLevel,
    /// Evaluate limits against the job's partition in addition to the
    /// global partition.
    pub per_partition_scheduling: bool,
    /// In the fairshare walk, a dimension settled at a more specific
    /// ancestor is not re-checked at less specific ones.
    pub most_specific_limit: bool,
    /// Let a QOS override replace even an explicitly zero limit.
    pub always_apply_qos_override: bool,
    /// Validate generic resources when offering to virtual machines.
    pub validate_vm_gres: bool,
    /// Per-node task cap seeding task-count computations.
    pub max_tasks_per_node: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy_level: PolicyLevel::Hard,
            per_partition_scheduling: false,
            most_specific_limit: false,
            always_apply_qos_override: false,
            validate_vm_gres: false,
            max_tasks_per_node: DEFAULT_TASKS_PER_NODE,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tasks_per_node <= 0 {
            return Err("max_tasks_per_node must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// A parse or validation failure description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
