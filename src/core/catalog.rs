//! Generic-resource name registry.

use std::collections::HashMap;

/// Index of a generic resource within sparse vectors.
///
/// Index 0 is reserved for the aggregate total and never names a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GresIndex(pub usize);

impl GresIndex {
    /// The reserved aggregate slot.
    pub const TOTAL: Self = Self(0);
}

/// Name↔index registry for generic resources.
///
/// The catalog is an injected capability: every routine that resolves
/// generic-resource names receives it explicitly. Names are matched
/// case-insensitively and unknown names auto-register on first use.
#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    names: Vec<String>,
    index: HashMap<String, GresIndex>,
}

impl ResourceCatalog {
    /// Create an empty catalog. Slot 0 stays reserved.
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: vec![String::new()],
            index: HashMap::new(),
        }
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    /// True when nothing has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.len() == 1
    }

    /// Look up a name without registering it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<GresIndex> {
        self.index.get(&name.to_ascii_lowercase()).copied()
    }

    /// Resolve a name to its index, registering it when unseen.
    pub fn register(&mut self, name: &str) -> GresIndex {
        let key = name.to_ascii_lowercase();
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        let idx = GresIndex(self.names.len());
        self.names.push(key.clone());
        self.index.insert(key, idx);
        idx
    }

    /// Name registered at an index, if any. The reserved slot has no name.
    #[must_use]
    pub fn name(&self, idx: GresIndex) -> Option<&str> {
        if idx.0 == 0 {
            return None;
        }
        self.names.get(idx.0).map(String::as_str)
    }

    /// Iterate registered `(index, name)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (GresIndex, &str)> {
        self.names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, n)| (GresIndex(i), n.as_str()))
    }
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
