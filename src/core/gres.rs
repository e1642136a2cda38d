//! Sparse generic-resource vectors.

use std::collections::BTreeMap;

use crate::core::catalog::GresIndex;

/// Sparse per-index generic-resource counts with a maintained aggregate
/// total.
///
/// The total lives at the reserved index 0 and is updated on every
/// mutation, so `count(GresIndex::TOTAL)` stays the sum of all entries.
/// Counts may go negative transiently during subtract-style arithmetic;
/// zero entries are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GresVector {
    counts: BTreeMap<GresIndex, i64>,
    total: i64,
}

impl GresVector {
    /// Empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no entry is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Aggregate total across all entries.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Count at an index; the reserved index reports the total.
    #[must_use]
    pub fn count(&self, idx: GresIndex) -> i64 {
        if idx == GresIndex::TOTAL {
            return self.total;
        }
        self.counts.get(&idx).copied().unwrap_or(0)
    }

    /// Set the count at an index, keeping the total in step. Setting the
    /// reserved index rewrites the total alone.
    pub fn set_count(&mut self, idx: GresIndex, value: i64) {
        if idx == GresIndex::TOTAL {
            self.total = value;
            return;
        }
        let old = self.counts.get(&idx).copied().unwrap_or(0);
        self.total += value - old;
        if value == 0 {
            self.counts.remove(&idx);
        } else {
            self.counts.insert(idx, value);
        }
    }

    /// Add a delta to the count at an index.
    pub fn add_count(&mut self, idx: GresIndex, delta: i64) {
        if delta != 0 {
            self.set_count(idx, self.count(idx) + delta);
        }
    }

    /// Drop every entry and reset the total.
    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }

    /// Iterate nonzero `(index, count)` entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (GresIndex, i64)> + '_ {
        self.counts.iter().map(|(i, c)| (*i, *c))
    }

    /// Multiply every entry by a factor.
    pub fn times(&mut self, factor: i64) {
        for count in self.counts.values_mut() {
            *count *= factor;
        }
        self.total *= factor;
        if factor == 0 {
            self.counts.clear();
        }
    }

    /// Copy scaled by a factor.
    #[must_use]
    pub fn scaled(&self, factor: i64) -> Self {
        let mut out = self.clone();
        out.times(factor);
        out
    }

    /// Elementwise `self += other`.
    pub fn plus(&mut self, other: &Self) {
        for (idx, count) in other.iter() {
            self.add_count(idx, count);
        }
    }

    /// Elementwise `self -= other`.
    pub fn minus(&mut self, other: &Self) {
        for (idx, count) in other.iter() {
            self.add_count(idx, -count);
        }
    }

    /// Elementwise combination over the union of populated indices.
    /// Absent entries combine as zero.
    pub fn combine(&mut self, other: &Self, f: impl Fn(i64, i64) -> i64) {
        let indices: Vec<GresIndex> = self
            .counts
            .keys()
            .chain(other.counts.keys())
            .copied()
            .collect();
        for idx in indices {
            self.set_count(idx, f(self.count(idx), other.count(idx)));
        }
    }

    /// Number of replicas of this requirement satisfiable by `avail`.
    ///
    /// An empty requirement fits an unlimited number of times; a nonempty
    /// requirement against an empty availability fits zero times. Otherwise
    /// the replica count is bounded by the aggregate totals and by every
    /// demanded index.
    #[must_use]
    pub fn fits_within(&self, avail: &Self) -> i64 {
        if self.is_empty() {
            return i64::MAX;
        }
        if avail.is_empty() {
            return 0;
        }
        if self.total <= 0 {
            return i64::MAX;
        }
        let mut count = avail.total() / self.total;
        for (idx, required) in self.iter() {
            if required <= 0 {
                continue;
            }
            count = count.min(avail.count(idx) / required);
            if count == 0 {
                return 0;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gv(entries: &[(usize, i64)]) -> GresVector {
        let mut v = GresVector::new();
        for (i, c) in entries {
            v.set_count(GresIndex(*i), *c);
        }
        v
    }

    #[test]
    fn test_total_tracks_mutations() {
        let mut v = gv(&[(1, 2), (2, 3)]);
        assert_eq!(v.total(), 5);
        v.set_count(GresIndex(1), 0);
        assert_eq!(v.total(), 3);
        assert_eq!(v.count(GresIndex(1)), 0);
        v.add_count(GresIndex(2), -5);
        assert_eq!(v.count(GresIndex(2)), -2);
        assert_eq!(v.total(), -2);
    }

    #[test]
    fn test_zero_entries_not_stored() {
        let mut v = gv(&[(1, 4)]);
        v.add_count(GresIndex(1), -4);
        assert!(v.is_empty());
        assert_eq!(v, GresVector::new());
    }

    #[test]
    fn test_fits_within_bounds() {
        let req = gv(&[(1, 2)]);
        let avail = gv(&[(1, 7), (2, 100)]);
        assert_eq!(req.fits_within(&avail), 3);

        // Empty requirement fits without bound.
        assert_eq!(GresVector::new().fits_within(&avail), i64::MAX);

        // Nothing available for a real requirement.
        assert_eq!(req.fits_within(&GresVector::new()), 0);

        // Demanded index missing from availability.
        let other = gv(&[(2, 10)]);
        assert_eq!(req.fits_within(&other), 0);
    }

    #[test]
    fn test_combine_union() {
        let mut a = gv(&[(1, 5), (2, 1)]);
        let b = gv(&[(2, 4), (3, 2)]);
        a.combine(&b, i64::max);
        assert_eq!(a.count(GresIndex(1)), 5);
        assert_eq!(a.count(GresIndex(2)), 4);
        assert_eq!(a.count(GresIndex(3)), 2);
        assert_eq!(a.total(), 11);
    }
}
