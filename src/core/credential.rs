//! Credentials, their limit sets, and the credential registry.

use std::collections::{HashMap, HashSet};

use crate::core::policy::{LimitCategory, PartitionId, PolicyDimension, UsageRecord};

/// Kinds of entity a job is associated with, each optionally carrying
/// limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Submitting user.
    User,
    /// Submitting group.
    Group,
    /// Charge account.
    Account,
    /// Class / queue.
    Class,
    /// Quality-of-service level.
    Qos,
    /// Scheduling partition.
    Partition,
}

impl CredentialKind {
    /// Short diagnostic label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Account => "acct",
            Self::Class => "class",
            Self::Qos => "qos",
            Self::Partition => "par",
        }
    }
}

/// Which primary credential kinds a QOS override reaches.
///
/// The `direct` flag covers a credential's own limits (no cross-credential
/// qualifier). The resolver consults this set; it is never mutated during a
/// traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryScope {
    /// Own limits, with no qualifier.
    pub direct: bool,
    /// Per-user nested limits.
    pub user: bool,
    /// Per-group nested limits.
    pub group: bool,
    /// Per-account nested limits.
    pub account: bool,
    /// Per-class nested limits.
    pub class: bool,
    /// Per-QOS nested limits.
    pub qos: bool,
}

impl PrimaryScope {
    /// Override applies everywhere.
    pub const ALL: Self = Self {
        direct: true,
        user: true,
        group: true,
        account: true,
        class: true,
        qos: true,
    };

    /// True when the scope covers the qualifier.
    #[must_use]
    pub const fn contains(self, primary: Option<CredentialKind>) -> bool {
        match primary {
            None => self.direct,
            Some(CredentialKind::User) => self.user,
            Some(CredentialKind::Group) => self.group,
            Some(CredentialKind::Account) => self.account,
            Some(CredentialKind::Class) => self.class,
            Some(CredentialKind::Qos) => self.qos,
            Some(CredentialKind::Partition) => false,
        }
    }
}

impl Default for PrimaryScope {
    fn default() -> Self {
        Self::ALL
    }
}

/// The full set of limit records one credential owns.
#[derive(Debug, Clone, Default)]
pub struct CredentialLimitSet {
    /// Limits and usage for running workload. Always present.
    pub active: UsageRecord,
    /// Limits and usage for queued workload.
    pub idle: Option<UsageRecord>,
    /// Limits and usage tracked system-wide.
    pub system: Option<UsageRecord>,
    /// QOS-sourced override for active limits.
    pub override_active: Option<UsageRecord>,
    /// QOS-sourced override for idle limits.
    pub override_idle: Option<UsageRecord>,
    /// QOS-sourced override for system limits.
    pub override_system: Option<UsageRecord>,
    /// Primary kinds the overrides reach.
    pub override_scope: PrimaryScope,
    /// Dimensions jobs under this QOS are exempt from.
    pub exempt: HashSet<PolicyDimension>,
    cross_active: HashMap<(CredentialKind, String), UsageRecord>,
    cross_idle: HashMap<(CredentialKind, String), UsageRecord>,
}

impl CredentialLimitSet {
    /// Empty limit set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The record tracking a category, if the credential tracks it.
    #[must_use]
    pub fn record(&self, category: LimitCategory) -> Option<&UsageRecord> {
        match category {
            LimitCategory::Active => Some(&self.active),
            LimitCategory::Idle => self.idle.as_ref(),
            LimitCategory::System => self.system.as_ref(),
        }
    }

    /// Mutable record for a category; absent idle/system records stay
    /// absent.
    pub fn record_mut(&mut self, category: LimitCategory) -> Option<&mut UsageRecord> {
        match category {
            LimitCategory::Active => Some(&mut self.active),
            LimitCategory::Idle => self.idle.as_mut(),
            LimitCategory::System => self.system.as_mut(),
        }
    }

    /// Mutable record for a category, created on demand. Used at
    /// configuration load.
    pub fn ensure_record(&mut self, category: LimitCategory) -> &mut UsageRecord {
        match category {
            LimitCategory::Active => &mut self.active,
            LimitCategory::Idle => self.idle.get_or_insert_with(UsageRecord::new),
            LimitCategory::System => self.system.get_or_insert_with(UsageRecord::new),
        }
    }

    /// The QOS override record for a category.
    #[must_use]
    pub fn override_record(&self, category: LimitCategory) -> Option<&UsageRecord> {
        match category {
            LimitCategory::Active => self.override_active.as_ref(),
            LimitCategory::Idle => self.override_idle.as_ref(),
            LimitCategory::System => self.override_system.as_ref(),
        }
    }

    /// Nested per-other-credential record, if configured. Only active and
    /// idle limits nest.
    #[must_use]
    pub fn cross(
        &self,
        category: LimitCategory,
        kind: CredentialKind,
        name: &str,
    ) -> Option<&UsageRecord> {
        let table = match category {
            LimitCategory::Active => &self.cross_active,
            LimitCategory::Idle => &self.cross_idle,
            LimitCategory::System => return None,
        };
        table.get(&(kind, name.to_string()))
    }

    /// Mutable nested record, if one exists.
    pub fn cross_mut(
        &mut self,
        category: LimitCategory,
        kind: CredentialKind,
        name: &str,
    ) -> Option<&mut UsageRecord> {
        let table = match category {
            LimitCategory::Active => &mut self.cross_active,
            LimitCategory::Idle => &mut self.cross_idle,
            LimitCategory::System => return None,
        };
        table.get_mut(&(kind, name.to_string()))
    }

    /// Nested record created on demand. Returns `None` for the system
    /// category, which does not nest.
    pub fn ensure_cross(
        &mut self,
        category: LimitCategory,
        kind: CredentialKind,
        name: &str,
    ) -> Option<&mut UsageRecord> {
        let table = match category {
            LimitCategory::Active => &mut self.cross_active,
            LimitCategory::Idle => &mut self.cross_idle,
            LimitCategory::System => return None,
        };
        Some(table.entry((kind, name.to_string())).or_default())
    }

    /// True when jobs under this QOS skip the dimension.
    #[must_use]
    pub fn is_exempt(&self, dimension: PolicyDimension) -> bool {
        self.exempt.contains(&dimension)
    }
}

/// One credential and its limits.
#[derive(Debug, Clone)]
pub struct Credential {
    /// What kind of credential this is.
    pub kind: CredentialKind,
    /// Credential name.
    pub name: String,
    /// Limits the credential owns.
    pub limits: CredentialLimitSet,
}

impl Credential {
    /// Credential with an empty limit set.
    #[must_use]
    pub fn new(kind: CredentialKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            limits: CredentialLimitSet::new(),
        }
    }
}

/// Rolling jobs-per-minute guard attached to a partition's resource
/// manager.
#[derive(Debug, Clone)]
pub struct SubmitRateGuard {
    /// Submissions allowed per minute; zero disables the guard.
    pub max_per_minute: u32,
    window_start: u64,
    submitted: u32,
}

impl SubmitRateGuard {
    /// Guard with a fresh window.
    #[must_use]
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            window_start: 0,
            submitted: 0,
        }
    }

    /// True when the current window is full.
    #[must_use]
    pub fn saturated(&self, now: u64) -> bool {
        self.max_per_minute > 0
            && self.window_start + 60 > now
            && self.submitted >= self.max_per_minute
    }

    /// Record one submission, rolling the window forward when stale.
    pub fn record(&mut self, now: u64) {
        if now >= self.window_start + 60 {
            self.window_start = now;
            self.submitted = 0;
        }
        self.submitted += 1;
    }
}

/// A scheduling partition: a credential of its own plus the rate guard.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Partition name; index 0 is named `ALL`.
    pub name: String,
    /// Limits attached to the partition.
    pub limits: CredentialLimitSet,
    /// Optional resource-manager submission-rate guard.
    pub rate_guard: Option<SubmitRateGuard>,
}

impl Partition {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            limits: CredentialLimitSet::new(),
            rate_guard: None,
        }
    }
}

/// All credentials known to the scheduler, the per-kind defaults, and the
/// partition table.
#[derive(Debug, Clone)]
pub struct CredentialRegistry {
    users: HashMap<String, Credential>,
    groups: HashMap<String, Credential>,
    accounts: HashMap<String, Credential>,
    classes: HashMap<String, Credential>,
    qos: HashMap<String, Credential>,
    defaults: HashMap<CredentialKind, Credential>,
    partitions: Vec<Partition>,
}

impl CredentialRegistry {
    /// Registry holding only the global partition.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            groups: HashMap::new(),
            accounts: HashMap::new(),
            classes: HashMap::new(),
            qos: HashMap::new(),
            defaults: HashMap::new(),
            partitions: vec![Partition::new("ALL")],
        }
    }

    fn map(&self, kind: CredentialKind) -> Option<&HashMap<String, Credential>> {
        match kind {
            CredentialKind::User => Some(&self.users),
            CredentialKind::Group => Some(&self.groups),
            CredentialKind::Account => Some(&self.accounts),
            CredentialKind::Class => Some(&self.classes),
            CredentialKind::Qos => Some(&self.qos),
            CredentialKind::Partition => None,
        }
    }

    fn map_mut(&mut self, kind: CredentialKind) -> Option<&mut HashMap<String, Credential>> {
        match kind {
            CredentialKind::User => Some(&mut self.users),
            CredentialKind::Group => Some(&mut self.groups),
            CredentialKind::Account => Some(&mut self.accounts),
            CredentialKind::Class => Some(&mut self.classes),
            CredentialKind::Qos => Some(&mut self.qos),
            CredentialKind::Partition => None,
        }
    }

    /// Look up a credential. Partitions are addressed by
    /// [`CredentialRegistry::partition`] instead.
    #[must_use]
    pub fn credential(&self, kind: CredentialKind, name: &str) -> Option<&Credential> {
        self.map(kind)?.get(name)
    }

    /// Look up or create a credential, as accounting and configuration
    /// load do. Returns `None` for the partition kind.
    pub fn credential_mut(&mut self, kind: CredentialKind, name: &str) -> Option<&mut Credential> {
        let map = self.map_mut(kind)?;
        Some(
            map.entry(name.to_string())
                .or_insert_with(|| Credential::new(kind, name)),
        )
    }

    /// Scheduler-wide default credential for a kind, if configured.
    #[must_use]
    pub fn default_credential(&self, kind: CredentialKind) -> Option<&Credential> {
        self.defaults.get(&kind)
    }

    /// Default credential for a kind, created on demand.
    pub fn default_credential_mut(&mut self, kind: CredentialKind) -> &mut Credential {
        self.defaults
            .entry(kind)
            .or_insert_with(|| Credential::new(kind, "DEFAULT"))
    }

    /// Register a partition, returning its id.
    pub fn add_partition(&mut self, name: impl Into<String>) -> PartitionId {
        let id = PartitionId(self.partitions.len());
        self.partitions.push(Partition::new(name));
        id
    }

    /// Partition by id.
    #[must_use]
    pub fn partition(&self, id: PartitionId) -> Option<&Partition> {
        self.partitions.get(id.0)
    }

    /// Mutable partition by id.
    pub fn partition_mut(&mut self, id: PartitionId) -> Option<&mut Partition> {
        self.partitions.get_mut(id.0)
    }

    /// The global partition.
    #[must_use]
    pub fn global_partition(&self) -> &Partition {
        &self.partitions[0]
    }

    /// Partition name for diagnostics; unknown ids report the global
    /// name.
    #[must_use]
    pub fn partition_name(&self, id: PartitionId) -> &str {
        self.partition(id).map_or("ALL", |p| p.name.as_str())
    }

    /// Number of partitions, the global one included.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}
