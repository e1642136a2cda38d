//! Tests for configuration validation

use admission_gate::config::{SchedulerConfig, DEFAULT_TASKS_PER_NODE};
use admission_gate::core::PolicyLevel;

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.policy_level, PolicyLevel::Hard);
    assert_eq!(cfg.max_tasks_per_node, DEFAULT_TASKS_PER_NODE);
    assert!(!cfg.per_partition_scheduling);
    assert!(!cfg.most_specific_limit);
}

#[test]
fn test_invalid_task_cap_rejected() {
    let cfg = SchedulerConfig {
        max_tasks_per_node: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "policy_level": "soft",
        "per_partition_scheduling": true,
        "most_specific_limit": true,
        "max_tasks_per_node": 16
    }"#;
    let cfg = SchedulerConfig::from_json_str(json).expect("valid config");
    assert_eq!(cfg.policy_level, PolicyLevel::Soft);
    assert!(cfg.per_partition_scheduling);
    assert!(cfg.most_specific_limit);
    assert_eq!(cfg.max_tasks_per_node, 16);
    // Unspecified flags keep their defaults.
    assert!(!cfg.always_apply_qos_override);
}

#[test]
fn test_config_from_json_rejects_bad_values() {
    assert!(SchedulerConfig::from_json_str("{\"policy_level\": \"loud\"}").is_err());
    assert!(SchedulerConfig::from_json_str("{\"max_tasks_per_node\": -1}").is_err());
}
