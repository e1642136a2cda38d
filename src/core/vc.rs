//! Virtual containers and their throttle policies.

use std::collections::HashSet;

use crate::core::credential::CredentialLimitSet;

/// Handle to a virtual container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VcId(pub usize);

/// A logical grouping of jobs carrying an optional, independently
/// configured throttle policy.
#[derive(Debug, Clone)]
pub struct VirtualContainer {
    /// Container name, used in diagnostics.
    pub name: String,
    /// Parent container, when nested.
    pub parent: Option<VcId>,
    /// Throttle limits; containers without one impose nothing.
    pub throttle: Option<CredentialLimitSet>,
}

/// Arena-backed virtual-container registry.
#[derive(Debug, Clone, Default)]
pub struct VcRegistry {
    containers: Vec<VirtualContainer>,
}

impl VcRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no container exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Register a container.
    pub fn add_container(
        &mut self,
        name: impl Into<String>,
        parent: Option<VcId>,
        throttle: Option<CredentialLimitSet>,
    ) -> VcId {
        let id = VcId(self.containers.len());
        self.containers.push(VirtualContainer {
            name: name.into(),
            parent,
            throttle,
        });
        id
    }

    /// Container by handle.
    #[must_use]
    pub fn container(&self, id: VcId) -> Option<&VirtualContainer> {
        self.containers.get(id.0)
    }

    /// Mutable container by handle.
    pub fn container_mut(&mut self, id: VcId) -> Option<&mut VirtualContainer> {
        self.containers.get_mut(id.0)
    }

    /// Throttle-carrying containers reachable from the given memberships:
    /// each membership and its ancestors, deduplicated, in first-visit
    /// order.
    #[must_use]
    pub fn throttled_lineage(&self, memberships: &[VcId]) -> Vec<VcId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for membership in memberships {
            let mut cursor = Some(*membership);
            let mut steps = 0;
            while let Some(id) = cursor {
                if !seen.insert(id) {
                    break;
                }
                let Some(vc) = self.container(id) else {
                    break;
                };
                if vc.throttle.is_some() {
                    out.push(id);
                }
                steps += 1;
                if steps >= self.containers.len() {
                    break;
                }
                cursor = vc.parent;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineage_dedups_shared_ancestors() {
        let mut reg = VcRegistry::new();
        let top = reg.add_container("top", None, Some(CredentialLimitSet::new()));
        let left = reg.add_container("left", Some(top), Some(CredentialLimitSet::new()));
        let right = reg.add_container("right", Some(top), None);

        let lineage = reg.throttled_lineage(&[left, right]);
        assert_eq!(lineage, vec![left, top]);
    }

    #[test]
    fn test_lineage_empty_without_throttles() {
        let mut reg = VcRegistry::new();
        let a = reg.add_container("a", None, None);
        assert!(reg.throttled_lineage(&[a]).is_empty());
    }
}
