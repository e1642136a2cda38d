//! Tests for usage-record bookkeeping

use admission_gate::core::{PartitionId, PolicyDimension, PolicyLevel, UsageRecord};

const P0: PartitionId = PartitionId::GLOBAL;

#[test]
fn test_limit_tier_selection() {
    let mut record = UsageRecord::new();
    record.set_limits(PolicyDimension::MaxProc, P0, Some(8), Some(16));
    assert_eq!(
        record.limit_for(PolicyDimension::MaxProc, P0, PolicyLevel::Soft),
        Some(8)
    );
    assert_eq!(
        record.limit_for(PolicyDimension::MaxProc, P0, PolicyLevel::Hard),
        Some(16)
    );
}

#[test]
fn test_soft_falls_back_to_hard() {
    let mut record = UsageRecord::new();
    record.set_hard_limit(PolicyDimension::MaxJob, P0, 3);
    assert_eq!(
        record.limit_for(PolicyDimension::MaxJob, P0, PolicyLevel::Soft),
        Some(3)
    );
    assert!(record.has_limit(PolicyDimension::MaxJob, P0));
    assert!(!record.has_limit(PolicyDimension::MaxJob, PartitionId(1)));
}

#[test]
fn test_per_partition_slots_are_independent() {
    let batch = PartitionId(1);
    let mut record = UsageRecord::new();
    record.set_hard_limit(PolicyDimension::MaxJob, P0, 10);
    record.set_hard_limit(PolicyDimension::MaxJob, batch, 2);
    record.set_usage(PolicyDimension::MaxJob, batch, 2);
    assert_eq!(record.usage(PolicyDimension::MaxJob, P0), 0);
    assert_eq!(record.usage(PolicyDimension::MaxJob, batch), 2);
}

#[test]
fn test_usage_underflow_clamps_and_reports() {
    let mut record = UsageRecord::new();
    record.set_usage(PolicyDimension::MaxProc, P0, 2);
    // No limits on the slot: clamp without a violation report.
    assert!(!record.adjust_usage(PolicyDimension::MaxProc, P0, -5));
    assert_eq!(record.usage(PolicyDimension::MaxProc, P0), 0);

    record.set_hard_limit(PolicyDimension::MaxProc, P0, 4);
    record.set_usage(PolicyDimension::MaxProc, P0, 1);
    assert!(record.adjust_usage(PolicyDimension::MaxProc, P0, -2));
}

#[test]
fn test_gres_slots() {
    let mut record = UsageRecord::new();
    assert!(!record.has_gres_limits());
    record.gres_entry_mut("gpu", P0).hard = Some(8);
    assert!(record.has_gres_limits());
    assert!(record.gres_known("gpu"));
    assert!(!record.gres_known("matlab"));

    assert!(!record.adjust_gres_usage("gpu", P0, 3));
    assert_eq!(record.gres_usage("gpu", P0), 3);
    // Underflow on a limited slot reports a violation.
    assert!(record.adjust_gres_usage("gpu", P0, -5));
    assert_eq!(record.gres_usage("gpu", P0), 0);
}
