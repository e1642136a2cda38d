//! Resolution of applicable usage records per credential-kind pair.
//!
//! The resolver answers "where to look": for an ordered
//! `(primary, secondary)` credential-kind pair and a limit category it
//! returns the record to check, the default-credential fallback, and the
//! QOS override with its applicability already decided. "How to check"
//! stays in [`crate::core::policy::check_dimension`].

use crate::core::credential::{CredentialKind, CredentialRegistry};
use crate::core::job::CandidateJob;
use crate::core::policy::{LimitCategory, PartitionId, PolicyDimension, RecordSet, UsageRecord};

/// Primary (qualifier) kinds in evaluation order. `None` selects a
/// credential's own limits.
pub const PRIMARY_KINDS: [Option<CredentialKind>; 6] = [
    None,
    Some(CredentialKind::User),
    Some(CredentialKind::Group),
    Some(CredentialKind::Account),
    Some(CredentialKind::Class),
    Some(CredentialKind::Qos),
];

/// Secondary (record-owning) kinds in evaluation order.
pub const SECONDARY_KINDS: [CredentialKind; 6] = [
    CredentialKind::User,
    CredentialKind::Group,
    CredentialKind::Account,
    CredentialKind::Class,
    CredentialKind::Qos,
    CredentialKind::Partition,
];

/// One resolved lookup: the records to evaluate plus the identity of the
/// credential they belong to, for diagnostics.
#[derive(Debug)]
pub struct ResolvedRecords<'a> {
    /// Records in check precedence (object, fallback, override).
    pub records: RecordSet<'a>,
    /// Kind of the credential owning the record.
    pub kind: CredentialKind,
    /// Name of the credential owning the record.
    pub name: &'a str,
    /// Cross-credential qualifier, when the record is nested.
    pub qualifier: Option<CredentialKind>,
}

/// Record lookup for one job against one registry.
pub struct LimitResolver<'a> {
    registry: &'a CredentialRegistry,
    job: &'a CandidateJob,
    partition: PartitionId,
}

impl<'a> LimitResolver<'a> {
    /// Resolver for a job evaluated against a partition.
    #[must_use]
    pub fn new(
        registry: &'a CredentialRegistry,
        job: &'a CandidateJob,
        partition: PartitionId,
    ) -> Self {
        Self {
            registry,
            job,
            partition,
        }
    }

    /// The job's credential name for a kind, when it has one.
    #[must_use]
    pub fn credential_name(&self, kind: CredentialKind) -> Option<&'a str> {
        let creds = &self.job.credentials;
        match kind {
            CredentialKind::User => creds.user.as_deref(),
            CredentialKind::Group => creds.group.as_deref(),
            CredentialKind::Account => creds.account.as_deref(),
            CredentialKind::Class => creds.class.as_deref(),
            CredentialKind::Qos => creds.qos.as_deref(),
            CredentialKind::Partition => None,
        }
    }

    fn qos_limits(&self) -> Option<&'a crate::core::credential::CredentialLimitSet> {
        let name = self.credential_name(CredentialKind::Qos)?;
        Some(
            &self
                .registry
                .credential(CredentialKind::Qos, name)?
                .limits,
        )
    }

    /// The job's QOS override record for a category, regardless of scope.
    #[must_use]
    pub fn qos_override(&self, category: LimitCategory) -> Option<&'a UsageRecord> {
        self.qos_limits()?.override_record(category)
    }

    /// Whether the QOS override reaches a primary kind.
    #[must_use]
    pub fn override_applies(&self, primary: Option<CredentialKind>) -> bool {
        self.qos_limits()
            .is_none_or(|l| l.override_scope.contains(primary))
    }

    /// True when the job's QOS exempts the dimension.
    #[must_use]
    pub fn is_exempt(&self, dimension: PolicyDimension) -> bool {
        self.qos_limits().is_some_and(|l| l.is_exempt(dimension))
    }

    /// Resolve the records for one `(primary, secondary)` pair and
    /// category. Returns `None` when the job lacks the credentials or no
    /// record is configured; the caller skips the pair.
    #[must_use]
    pub fn resolve(
        &self,
        primary: Option<CredentialKind>,
        secondary: CredentialKind,
        category: LimitCategory,
    ) -> Option<ResolvedRecords<'a>> {
        let qos_override = if self.override_applies(primary) {
            self.qos_override(category)
        } else {
            None
        };

        if secondary == CredentialKind::Partition {
            // Partition records carry no cross-credential nesting; the
            // pair resolves once, under the bare primary.
            if primary.is_some() {
                return None;
            }
            let partition = self.registry.partition(self.partition)?;
            let record = partition.limits.record(category)?;
            let fallback = self.registry.global_partition().limits.record(category);
            return Some(ResolvedRecords {
                records: RecordSet {
                    record: Some(record),
                    fallback,
                    qos_override,
                },
                kind: CredentialKind::Partition,
                name: &partition.name,
                qualifier: None,
            });
        }

        let name = self.credential_name(secondary)?;
        let credential = self.registry.credential(secondary, name)?;
        let record = match primary {
            None => credential.limits.record(category)?,
            Some(qualifier_kind) => {
                let qualifier_name = self.credential_name(qualifier_kind)?;
                credential
                    .limits
                    .cross(category, qualifier_kind, qualifier_name)?
            }
        };
        let fallback = self
            .registry
            .default_credential(secondary)
            .and_then(|d| d.limits.record(category));

        Some(ResolvedRecords {
            records: RecordSet {
                record: Some(record),
                fallback,
                qos_override,
            },
            kind: secondary,
            name: &credential.name,
            qualifier: primary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::JobConsumption;
    use crate::core::policy::PolicyDimension;

    fn job() -> CandidateJob {
        let mut job = CandidateJob::new("job.1", JobConsumption::default());
        job.credentials.user = Some("steve".into());
        job.credentials.account = Some("eng".into());
        job.credentials.qos = Some("premium".into());
        job
    }

    #[test]
    fn test_resolve_direct_and_cross() {
        let mut registry = CredentialRegistry::new();
        let user = registry
            .credential_mut(CredentialKind::User, "steve")
            .expect("user kind");
        user.limits.active.set_hard_limit(
            PolicyDimension::MaxJob,
            PartitionId::GLOBAL,
            3,
        );
        user.limits
            .ensure_cross(LimitCategory::Active, CredentialKind::Account, "eng")
            .expect("active nests")
            .set_hard_limit(PolicyDimension::MaxJob, PartitionId::GLOBAL, 1);

        let job = job();
        let resolver = LimitResolver::new(&registry, &job, PartitionId::GLOBAL);

        let direct = resolver
            .resolve(None, CredentialKind::User, LimitCategory::Active)
            .expect("direct record");
        assert_eq!(direct.kind, CredentialKind::User);
        assert_eq!(direct.name, "steve");
        assert_eq!(direct.qualifier, None);

        let cross = resolver
            .resolve(
                Some(CredentialKind::Account),
                CredentialKind::User,
                LimitCategory::Active,
            )
            .expect("cross record");
        assert_eq!(cross.qualifier, Some(CredentialKind::Account));

        // No group credential on the job: the pair is skipped.
        assert!(resolver
            .resolve(None, CredentialKind::Group, LimitCategory::Active)
            .is_none());

        // No idle record configured: the pair is skipped.
        assert!(resolver
            .resolve(None, CredentialKind::User, LimitCategory::Idle)
            .is_none());
    }

    #[test]
    fn test_override_scope_gates_application() {
        let mut registry = CredentialRegistry::new();
        let qos = registry
            .credential_mut(CredentialKind::Qos, "premium")
            .expect("qos kind");
        let mut override_record = UsageRecord::new();
        override_record.set_hard_limit(PolicyDimension::MaxJob, PartitionId::GLOBAL, 50);
        qos.limits.override_active = Some(override_record);
        qos.limits.override_scope.account = false;
        registry
            .credential_mut(CredentialKind::User, "steve")
            .expect("user kind");

        let job = job();
        let resolver = LimitResolver::new(&registry, &job, PartitionId::GLOBAL);

        let direct = resolver
            .resolve(None, CredentialKind::User, LimitCategory::Active)
            .expect("record");
        assert!(direct.records.qos_override.is_some());

        assert!(!resolver.override_applies(Some(CredentialKind::Account)));
        assert!(resolver.override_applies(Some(CredentialKind::User)));
    }

    #[test]
    fn test_partition_pair_resolves_once() {
        let mut registry = CredentialRegistry::new();
        let batch = registry.add_partition("batch");
        registry
            .partition_mut(batch)
            .expect("partition")
            .limits
            .ensure_record(LimitCategory::System)
            .set_hard_limit(PolicyDimension::MaxJob, PartitionId::GLOBAL, 7);

        let job = job();
        let resolver = LimitResolver::new(&registry, &job, batch);

        let resolved = resolver
            .resolve(None, CredentialKind::Partition, LimitCategory::System)
            .expect("partition record");
        assert_eq!(resolved.name, "batch");

        assert!(resolver
            .resolve(
                Some(CredentialKind::User),
                CredentialKind::Partition,
                LimitCategory::System,
            )
            .is_none());
    }
}
