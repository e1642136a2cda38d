//! Tests for diagnostic formatting

use admission_gate::core::{
    AdmissionError, CredentialKind, LimitCategory, LimitViolation, PolicyDimension, PolicyLevel,
    ViolationScope,
};

fn violation(scope: ViolationScope) -> LimitViolation {
    LimitViolation {
        job: "job.42".into(),
        scope,
        category: LimitCategory::Active,
        level: PolicyLevel::Hard,
        dimension: PolicyDimension::MaxJob,
        used_override: false,
        partition: "ALL".into(),
        limit: 5,
        requested: 1,
        in_use: 5,
    }
}

#[test]
fn test_credential_violation_names_everything() {
    let v = violation(ViolationScope::Credential {
        kind: CredentialKind::Account,
        name: "eng".into(),
        qualifier: None,
    });
    assert_eq!(
        v.to_string(),
        "job job.42 violates active HARD MAXJOB limit of 5 for acct eng  partition ALL (Req: 1  InUse: 5)"
    );
}

#[test]
fn test_override_and_qualifier_rendered() {
    let mut v = violation(ViolationScope::Credential {
        kind: CredentialKind::User,
        name: "steve".into(),
        qualifier: Some(CredentialKind::Account),
    });
    v.used_override = true;
    let msg = v.to_string();
    assert!(msg.contains("QoS override"));
    assert!(msg.contains("user steve acct"));
}

#[test]
fn test_idle_dimension_spelling() {
    let mut v = violation(ViolationScope::Fairshare { node: "eng".into() });
    v.category = LimitCategory::Idle;
    let msg = v.to_string();
    assert!(msg.contains("MAXIJOB"));
    assert!(msg.contains("fairshare node eng"));
}

#[test]
fn test_error_variants_render() {
    let rate = AdmissionError::SubmitRateExceeded {
        job: "job.1".into(),
        partition: "batch".into(),
        limit: 10,
    };
    assert_eq!(
        rate.to_string(),
        "job job.1 violates maxjobperminute policy for partition batch (limit: 10)"
    );

    let slot = AdmissionError::ArraySlotLimit {
        job: "job.1[3]".into(),
        array: "sweep".into(),
        limit: 4,
    };
    assert_eq!(
        slot.to_string(),
        "job 'job.1[3]' violates array 'sweep' slot limit of 4"
    );

    let invalid = AdmissionError::InvalidArgument("no partition".into());
    assert_eq!(invalid.to_string(), "invalid argument: no partition");
}
