//! Fairshare-usage tree with per-node limits.

use crate::core::credential::CredentialLimitSet;

/// Handle to a node in the fairshare tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FairshareNodeId(pub usize);

/// One node of the fairshare tree. Leaves are the most specific
/// credentials (typically users); ancestors generalize upward.
#[derive(Debug, Clone)]
pub struct FairshareNode {
    /// Node name, used in diagnostics.
    pub name: String,
    /// Parent node; the root has none.
    pub parent: Option<FairshareNodeId>,
    /// Limits attached to this node.
    pub limits: CredentialLimitSet,
}

/// Arena-backed fairshare tree.
#[derive(Debug, Clone, Default)]
pub struct FairshareTree {
    nodes: Vec<FairshareNode>,
}

impl FairshareTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no node exists; fairshare limits are skipped entirely.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Add a node under an optional parent.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<FairshareNodeId>,
    ) -> FairshareNodeId {
        let id = FairshareNodeId(self.nodes.len());
        self.nodes.push(FairshareNode {
            name: name.into(),
            parent,
            limits: CredentialLimitSet::new(),
        });
        id
    }

    /// Node by handle.
    #[must_use]
    pub fn node(&self, id: FairshareNodeId) -> Option<&FairshareNode> {
        self.nodes.get(id.0)
    }

    /// Mutable node by handle.
    pub fn node_mut(&mut self, id: FairshareNodeId) -> Option<&mut FairshareNode> {
        self.nodes.get_mut(id.0)
    }

    /// Ancestor chain from a leaf to the root, leaf first. Walk length is
    /// capped at the node count, so a malformed parent cycle terminates.
    #[must_use]
    pub fn chain(&self, leaf: FairshareNodeId) -> Vec<FairshareNodeId> {
        let mut out = Vec::new();
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            let Some(node) = self.node(id) else {
                break;
            };
            out.push(id);
            if out.len() >= self.nodes.len() {
                break;
            }
            cursor = node.parent;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_walks_to_root() {
        let mut tree = FairshareTree::new();
        let root = tree.add_node("root", None);
        let acct = tree.add_node("eng", Some(root));
        let user = tree.add_node("steve", Some(acct));

        let chain = tree.chain(user);
        assert_eq!(chain, vec![user, acct, root]);
        assert_eq!(tree.chain(root), vec![root]);
    }

    #[test]
    fn test_chain_survives_cycle() {
        let mut tree = FairshareTree::new();
        let a = tree.add_node("a", None);
        let b = tree.add_node("b", Some(a));
        tree.node_mut(a).expect("node").parent = Some(b);

        // Bounded by node count rather than looping forever.
        assert_eq!(tree.chain(b).len(), 2);
    }
}
