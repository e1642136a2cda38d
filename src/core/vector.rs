//! Multi-dimensional resource vectors and their arithmetic.
//!
//! A [`ResourceVector`] carries the four built-in scalar dimensions
//! (processors, memory, swap, disk — memory-like values in MB) plus a sparse
//! set of generic resources. The same type serves as a configured capacity,
//! a per-task request, and a running accumulator; which role a value plays
//! determines whether the `All` amount is meaningful in it.

use crate::core::gres::GresVector;

/// A per-dimension quantity.
///
/// `All` is the typed form of the external `ALL` request ("everything
/// configured on the object") and only appears in request and blocked
/// vectors; configured capacities and accumulators hold `Fixed` values.
/// `All` resolves to the configured amount inside [`ResourceVector::add`],
/// [`ResourceVector::remove`], and
/// [`ResourceVector::copy_and_adjust_procs`]; elementwise combinators treat
/// it as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAmount {
    /// Everything configured on the object.
    All,
    /// A concrete amount. May be negative transiently mid-computation.
    Fixed(i64),
}

impl ResourceAmount {
    /// The concrete amount, if any.
    #[must_use]
    pub const fn known(self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Fixed(v) => Some(v),
        }
    }

    /// The concrete amount, with `All` reading as zero.
    #[must_use]
    pub const fn or_zero(self) -> i64 {
        match self {
            Self::All => 0,
            Self::Fixed(v) => v,
        }
    }

    /// True for the `All` request form.
    #[must_use]
    pub const fn is_all(self) -> bool {
        matches!(self, Self::All)
    }

    /// True for an exact zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        matches!(self, Self::Fixed(0))
    }
}

impl Default for ResourceAmount {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

impl From<i64> for ResourceAmount {
    fn from(v: i64) -> Self {
        Self::Fixed(v)
    }
}

/// The built-in scalar dimensions, in evaluation and display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarDimension {
    /// Processor count.
    Procs,
    /// Real memory, MB.
    Mem,
    /// Virtual memory, MB.
    Swap,
    /// Local disk, MB.
    Disk,
}

impl ScalarDimension {
    /// All scalar dimensions in canonical order.
    pub const ALL: [Self; 4] = [Self::Procs, Self::Mem, Self::Swap, Self::Disk];

    /// Display name used by the resource-spec grammar.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Procs => "PROCS",
            Self::Mem => "MEM",
            Self::Swap => "SWAP",
            Self::Disk => "DISK",
        }
    }

    /// Name used in shortfall diagnostics.
    #[must_use]
    pub const fn reject_label(self) -> &'static str {
        match self {
            Self::Procs => "CPU",
            Self::Mem => "Memory",
            Self::Swap => "Swap",
            Self::Disk => "Disk",
        }
    }

    /// True for the MB-denominated dimensions.
    #[must_use]
    pub const fn is_memory_like(self) -> bool {
        !matches!(self, Self::Procs)
    }
}

/// Dimension selection for the masked add/remove variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMask {
    /// Include processors.
    pub procs: bool,
    /// Include memory.
    pub mem: bool,
    /// Include swap.
    pub swap: bool,
    /// Include disk.
    pub disk: bool,
    /// Include generic resources.
    pub gres: bool,
}

impl DimensionMask {
    /// Every dimension.
    pub const ALL: Self = Self {
        procs: true,
        mem: true,
        swap: true,
        disk: true,
        gres: true,
    };

    /// Processors only.
    pub const PROCS: Self = Self {
        procs: true,
        mem: false,
        swap: false,
        disk: false,
        gres: false,
    };

    fn scalar(self, dim: ScalarDimension) -> bool {
        match dim {
            ScalarDimension::Procs => self.procs,
            ScalarDimension::Mem => self.mem,
            ScalarDimension::Swap => self.swap,
            ScalarDimension::Disk => self.disk,
        }
    }
}

/// Which dimension went negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeDimension {
    /// A built-in scalar dimension.
    Scalar(ScalarDimension),
    /// Some generic resource.
    Gres,
}

/// A multi-dimensional resource quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceVector {
    /// Processor count.
    pub procs: ResourceAmount,
    /// Real memory, MB.
    pub mem: ResourceAmount,
    /// Virtual memory, MB.
    pub swap: ResourceAmount,
    /// Local disk, MB.
    pub disk: ResourceAmount,
    /// Sparse generic-resource counts.
    pub gres: GresVector,
}

impl ResourceVector {
    /// Empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Vector with fixed scalar amounts and no generic resources.
    #[must_use]
    pub fn fixed(procs: i64, mem: i64, swap: i64, disk: i64) -> Self {
        Self {
            procs: ResourceAmount::Fixed(procs),
            mem: ResourceAmount::Fixed(mem),
            swap: ResourceAmount::Fixed(swap),
            disk: ResourceAmount::Fixed(disk),
            gres: GresVector::new(),
        }
    }

    /// Amount held in a scalar dimension.
    #[must_use]
    pub fn amount(&self, dim: ScalarDimension) -> ResourceAmount {
        match dim {
            ScalarDimension::Procs => self.procs,
            ScalarDimension::Mem => self.mem,
            ScalarDimension::Swap => self.swap,
            ScalarDimension::Disk => self.disk,
        }
    }

    /// Set a scalar dimension.
    pub fn set_amount(&mut self, dim: ScalarDimension, value: ResourceAmount) {
        match dim {
            ScalarDimension::Procs => self.procs = value,
            ScalarDimension::Mem => self.mem = value,
            ScalarDimension::Swap => self.swap = value,
            ScalarDimension::Disk => self.disk = value,
        }
    }

    /// Zero every dimension.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// True when no dimension holds a positive amount and no generic
    /// resources are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        ScalarDimension::ALL
            .iter()
            .all(|d| self.amount(*d).or_zero() <= 0)
            && self.gres.is_empty()
    }

    /// Copy `src`, resolving an `All` processor request against the
    /// configured vector.
    #[must_use]
    pub fn copy_and_adjust_procs(src: &Self, configured: &Self) -> Self {
        let mut out = src.clone();
        if out.procs.is_all() {
            out.procs = ResourceAmount::Fixed(configured.procs.or_zero());
        }
        out
    }

    /// Accumulate `count` tasks of `req` against the configured capacity
    /// `cfg`: each dimension grows by the configured amount for an `All`
    /// request and by `min(cfg, count × req)` otherwise. With
    /// `enforce_constraints` the accumulated value is clamped to the
    /// configured capacity afterward.
    pub fn add(&mut self, cfg: &Self, req: &Self, count: i64, enforce_constraints: bool) {
        self.add_masked(cfg, req, count, enforce_constraints, DimensionMask::ALL);
    }

    /// [`ResourceVector::add`] restricted to the masked dimensions.
    pub fn add_masked(
        &mut self,
        cfg: &Self,
        req: &Self,
        count: i64,
        enforce_constraints: bool,
        mask: DimensionMask,
    ) {
        self.apply_masked(cfg, req, count, enforce_constraints, mask, 1);
    }

    /// Mirror of [`ResourceVector::add`]: subtract `count` tasks of `req`.
    /// With `enforce_constraints` results floor at zero.
    pub fn remove(&mut self, cfg: &Self, req: &Self, count: i64, enforce_constraints: bool) {
        self.remove_masked(cfg, req, count, enforce_constraints, DimensionMask::ALL);
    }

    /// [`ResourceVector::remove`] restricted to the masked dimensions.
    pub fn remove_masked(
        &mut self,
        cfg: &Self,
        req: &Self,
        count: i64,
        enforce_constraints: bool,
        mask: DimensionMask,
    ) {
        if count == 0 {
            return;
        }
        self.apply_masked(cfg, req, count, enforce_constraints, mask, -1);
    }

    fn apply_masked(
        &mut self,
        cfg: &Self,
        req: &Self,
        count: i64,
        enforce_constraints: bool,
        mask: DimensionMask,
        sign: i64,
    ) {
        for dim in ScalarDimension::ALL {
            if !mask.scalar(dim) {
                continue;
            }
            let cfg_v = cfg.amount(dim).or_zero();
            let delta = match req.amount(dim).known() {
                None => cfg_v,
                Some(v) => cfg_v.min(count * v),
            };
            let mut next = self.amount(dim).or_zero() + sign * delta;
            if enforce_constraints {
                // Clamp into [0, configured] depending on direction.
                next = if sign > 0 { next.min(cfg_v) } else { next.max(0) };
            }
            self.set_amount(dim, ResourceAmount::Fixed(next));
        }

        if mask.gres {
            for (idx, req_count) in req.gres.iter() {
                if req_count == 0 {
                    continue;
                }
                let delta = cfg.gres.count(idx).min(count * req_count);
                self.gres.add_count(idx, sign * delta);
                if enforce_constraints && sign < 0 && self.gres.count(idx) < 0 {
                    self.gres.set_count(idx, 0);
                }
            }
        }
    }

    /// Unconditional `self += def × task_count` on every dimension.
    pub fn add_scaled(&mut self, def: &Self, task_count: i64) {
        if task_count <= 0 {
            return;
        }
        for dim in ScalarDimension::ALL {
            let next = self.amount(dim).or_zero() + def.amount(dim).or_zero() * task_count;
            self.set_amount(dim, ResourceAmount::Fixed(next));
        }
        let mut scaled = def.gres.clone();
        scaled.times(task_count);
        self.gres.plus(&scaled);
    }

    /// Multiply every dimension by a factor.
    pub fn times(&mut self, factor: i64) {
        for dim in ScalarDimension::ALL {
            self.set_amount(
                dim,
                ResourceAmount::Fixed(self.amount(dim).or_zero() * factor),
            );
        }
        self.gres.times(factor);
    }

    /// Elementwise minimum of two vectors.
    #[must_use]
    pub fn min_of(a: &Self, b: &Self) -> Self {
        Self::combined(a, b, i64::min)
    }

    /// Elementwise maximum of two vectors.
    #[must_use]
    pub fn max_of(a: &Self, b: &Self) -> Self {
        Self::combined(a, b, i64::max)
    }

    fn combined(a: &Self, b: &Self, f: fn(i64, i64) -> i64) -> Self {
        let mut out = Self::new();
        for dim in ScalarDimension::ALL {
            out.set_amount(
                dim,
                ResourceAmount::Fixed(f(a.amount(dim).or_zero(), b.amount(dim).or_zero())),
            );
        }
        out.gres = a.gres.clone();
        out.gres.combine(&b.gres, f);
        out
    }

    /// Unconstrained elementwise `self += other`.
    pub fn plus(&mut self, other: &Self) {
        for dim in ScalarDimension::ALL {
            let next = self.amount(dim).or_zero() + other.amount(dim).or_zero();
            self.set_amount(dim, ResourceAmount::Fixed(next));
        }
        self.gres.plus(&other.gres);
    }

    /// Unconstrained elementwise `self -= other`.
    pub fn minus(&mut self, other: &Self) {
        for dim in ScalarDimension::ALL {
            let next = self.amount(dim).or_zero() - other.amount(dim).or_zero();
            self.set_amount(dim, ResourceAmount::Fixed(next));
        }
        self.gres.minus(&other.gres);
    }

    /// Raise every dimension to at least the floor vector's amount.
    pub fn lower_bound(&mut self, floor: &Self) {
        for dim in ScalarDimension::ALL {
            let next = self.amount(dim).or_zero().max(floor.amount(dim).or_zero());
            self.set_amount(dim, ResourceAmount::Fixed(next));
        }
        self.gres.combine(&floor.gres, i64::max);
    }

    /// Normalize the task definition down to one processor, scaling the
    /// other dimensions and the task count to preserve the total.
    ///
    /// No-op when the vector requests at most one processor or when the
    /// task count is not positive. Afterward `procs == 1` and
    /// `task_count == original_procs × original_task_count`.
    pub fn normalize(&mut self, task_count: &mut i64) {
        let procs = self.procs.or_zero();
        if procs <= 1 || *task_count <= 0 {
            return;
        }
        let tc = *task_count;
        let total = procs * tc;

        self.procs = ResourceAmount::Fixed(1);
        for dim in [
            ScalarDimension::Mem,
            ScalarDimension::Swap,
            ScalarDimension::Disk,
        ] {
            let scaled = self.amount(dim).or_zero() * tc / total;
            self.set_amount(dim, ResourceAmount::Fixed(scaled));
        }

        let entries: Vec<_> = self.gres.iter().collect();
        for (idx, count) in entries {
            if count <= 0 {
                continue;
            }
            self.gres.set_count(idx, count * tc / total);
        }

        *task_count = total;
    }

    /// Number of `req` tasks that fit in `cfg` scaled by `multiplier`,
    /// seeded at the configured per-node task cap.
    ///
    /// Scalars are evaluated in canonical order; a dimension whose scaled
    /// capacity cannot hold even one task makes the request infeasible
    /// (returns 0, not an error). A nonempty generic-resource request
    /// further bounds the count by its feasible replica count.
    #[must_use]
    pub fn task_count(cfg: &Self, multiplier: i64, req: &Self, cap: i64) -> i64 {
        let factor = if multiplier <= 0 { 1 } else { multiplier };
        let mut tc = cap;

        for dim in ScalarDimension::ALL {
            let need = req.amount(dim).or_zero();
            if need == 0 {
                continue;
            }
            let have = cfg.amount(dim).or_zero() * factor;
            if have < need {
                tracing::debug!(
                    "inadequate {} (configured {} < requested {})",
                    dim.label(),
                    have,
                    need
                );
                return 0;
            }
            tc = tc.min(have / need);
        }

        if !req.gres.is_empty() {
            let avail = cfg.gres.scaled(factor);
            tc = tc.min(req.gres.fits_within(&avail));
        }

        tc
    }

    /// First dimension holding a negative amount, if any.
    ///
    /// When a demand filter is given, a negative generic resource counts
    /// only if the filter itself demands that resource.
    #[must_use]
    pub fn is_negative(&self, demand: Option<&Self>) -> Option<NegativeDimension> {
        for dim in [
            ScalarDimension::Procs,
            ScalarDimension::Mem,
            ScalarDimension::Disk,
            ScalarDimension::Swap,
        ] {
            if self.amount(dim).or_zero() < 0 {
                return Some(NegativeDimension::Scalar(dim));
            }
        }

        if self.gres.total() < 0 && demand.is_none() {
            return Some(NegativeDimension::Gres);
        }
        for (idx, count) in self.gres.iter() {
            if count < 0 && demand.is_none_or(|d| d.gres.count(idx) > 0) {
                return Some(NegativeDimension::Gres);
            }
        }

        None
    }

    /// True when any dimension is nonzero in both vectors.
    #[must_use]
    pub fn has_overlap(&self, other: &Self) -> bool {
        for dim in ScalarDimension::ALL {
            if !self.amount(dim).is_zero() && !other.amount(dim).is_zero() {
                return true;
            }
        }
        for (idx, count) in self.gres.iter() {
            if count != 0 && other.gres.count(idx) != 0 {
                return true;
            }
        }
        false
    }

    /// Check whether this availability can satisfy `needed`.
    ///
    /// A scalar shortfall fails only when the needed amount is positive;
    /// negative availability on an unneeded dimension is logged and, on a
    /// virtual machine, still fails. Generic resources must admit at least
    /// one replica (skipped for VMs unless `validate_vm_gres`).
    ///
    /// # Errors
    ///
    /// Returns a human-readable shortfall description.
    pub fn can_offer(
        &self,
        needed: &Self,
        is_vm: bool,
        validate_vm_gres: bool,
    ) -> Result<(), String> {
        for dim in ScalarDimension::ALL {
            let have = self.amount(dim).or_zero();
            let need = needed.amount(dim).or_zero();
            if have >= need {
                continue;
            }
            if need > 0 {
                let unit = if dim.is_memory_like() { "MB" } else { "" };
                return Err(format!(
                    "{need}{unit} {} required but only {have} available",
                    dim.reject_label()
                ));
            }
            // Availability went negative on a dimension the request does
            // not need; surface it but keep going.
            tracing::warn!(
                "negative resource ({} = {}) found to be available",
                dim.reject_label(),
                have
            );
            if is_vm {
                return Err(format!(
                    "negative {} availability on virtual machine",
                    dim.reject_label()
                ));
            }
        }

        if (!is_vm || validate_vm_gres) && needed.gres.fits_within(&self.gres) <= 0 {
            return Err("insufficient generic resources available".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::GresIndex;

    fn with_gres(mut v: ResourceVector, entries: &[(usize, i64)]) -> ResourceVector {
        for (i, c) in entries {
            v.gres.set_count(GresIndex(*i), *c);
        }
        v
    }

    #[test]
    fn test_add_clamps_to_configured() {
        let cfg = ResourceVector::fixed(8, 16000, 0, 0);
        let req = ResourceVector::fixed(2, 2000, 0, 0);
        let mut r = ResourceVector::new();
        r.add(&cfg, &req, 3, true);
        assert_eq!(r.procs, ResourceAmount::Fixed(6));
        assert_eq!(r.mem, ResourceAmount::Fixed(6000));
    }

    #[test]
    fn test_add_resolves_all_request() {
        let cfg = ResourceVector::fixed(16, 32000, 0, 0);
        let mut req = ResourceVector::fixed(0, 1000, 0, 0);
        req.procs = ResourceAmount::All;
        let mut r = ResourceVector::new();
        r.add(&cfg, &req, 2, false);
        assert_eq!(r.procs, ResourceAmount::Fixed(16));
        assert_eq!(r.mem, ResourceAmount::Fixed(2000));
    }

    #[test]
    fn test_remove_round_trips_add() {
        let cfg = ResourceVector::fixed(64, 128_000, 64_000, 500_000);
        let req = with_gres(ResourceVector::fixed(4, 8000, 0, 100), &[(1, 2)]);
        let mut r = with_gres(ResourceVector::fixed(10, 20000, 5, 1000), &[(1, 9)]);
        let before = r.clone();
        r.add(&cfg, &req, 3, false);
        r.remove(&cfg, &req, 3, false);
        assert_eq!(r, before);
    }

    #[test]
    fn test_remove_enforced_floors_at_zero() {
        let cfg = ResourceVector::fixed(8, 8000, 0, 0);
        let req = ResourceVector::fixed(4, 4000, 0, 0);
        let mut r = ResourceVector::fixed(2, 1000, 0, 0);
        r.remove(&cfg, &req, 1, true);
        assert_eq!(r.procs, ResourceAmount::Fixed(0));
        assert_eq!(r.mem, ResourceAmount::Fixed(0));
    }

    #[test]
    fn test_masked_add_touches_selected_dims_only() {
        let cfg = ResourceVector::fixed(8, 8000, 8000, 8000);
        let req = ResourceVector::fixed(2, 2000, 2000, 2000);
        let mut r = ResourceVector::new();
        r.add_masked(&cfg, &req, 1, false, DimensionMask::PROCS);
        assert_eq!(r.procs, ResourceAmount::Fixed(2));
        assert_eq!(r.mem, ResourceAmount::Fixed(0));
        assert_eq!(r.swap, ResourceAmount::Fixed(0));
        assert_eq!(r.disk, ResourceAmount::Fixed(0));
    }

    #[test]
    fn test_normalize_to_single_proc() {
        let mut r = ResourceVector::fixed(4, 8000, 0, 0);
        let mut tc = 2;
        r.normalize(&mut tc);
        assert_eq!(r.procs, ResourceAmount::Fixed(1));
        assert_eq!(r.mem, ResourceAmount::Fixed(2000));
        assert_eq!(tc, 8);
    }

    #[test]
    fn test_normalize_single_proc_noop() {
        let mut r = ResourceVector::fixed(1, 4000, 0, 0);
        let mut tc = 3;
        r.normalize(&mut tc);
        assert_eq!(r.mem, ResourceAmount::Fixed(4000));
        assert_eq!(tc, 3);
    }

    #[test]
    fn test_task_count_scalar_bound() {
        let cfg = ResourceVector::fixed(8, 16000, 0, 0);
        let req = ResourceVector::fixed(3, 4000, 0, 0);
        assert_eq!(ResourceVector::task_count(&cfg, 1, &req, 64), 2);
    }

    #[test]
    fn test_task_count_infeasible_returns_zero() {
        let cfg = ResourceVector::fixed(2, 16000, 0, 0);
        let req = ResourceVector::fixed(3, 4000, 0, 0);
        assert_eq!(ResourceVector::task_count(&cfg, 1, &req, 64), 0);
    }

    #[test]
    fn test_task_count_gres_bound() {
        let cfg = with_gres(ResourceVector::fixed(16, 0, 0, 0), &[(1, 3)]);
        let req = with_gres(ResourceVector::fixed(1, 0, 0, 0), &[(1, 2)]);
        assert_eq!(ResourceVector::task_count(&cfg, 1, &req, 64), 1);
    }

    #[test]
    fn test_can_offer_ignores_unneeded_zero() {
        let avail = ResourceVector::fixed(4, 0, 0, 0);
        let needed = ResourceVector::fixed(2, 0, 0, 0);
        assert!(avail.can_offer(&needed, false, false).is_ok());

        let avail = ResourceVector::fixed(1, 0, 0, 0);
        let needed = ResourceVector::fixed(2, 0, 0, 0);
        assert!(avail.can_offer(&needed, false, false).is_err());
    }

    #[test]
    fn test_can_offer_vm_rejects_negative_availability() {
        let avail = ResourceVector::fixed(4, -1, 0, 0);
        let needed = ResourceVector::fixed(2, 0, 0, 0);
        assert!(avail.can_offer(&needed, false, false).is_ok());
        assert!(avail.can_offer(&needed, true, false).is_err());
    }

    #[test]
    fn test_is_negative_with_demand_filter() {
        let r = with_gres(ResourceVector::fixed(1, 0, 0, 0), &[(1, -2), (2, 5)]);
        // Total is positive; only index 1 is negative.
        let unneedy = with_gres(ResourceVector::new(), &[(2, 1)]);
        let needy = with_gres(ResourceVector::new(), &[(1, 1)]);
        assert_eq!(r.is_negative(Some(&unneedy)), None);
        assert_eq!(r.is_negative(Some(&needy)), Some(NegativeDimension::Gres));
        assert_eq!(r.is_negative(None), Some(NegativeDimension::Gres));
    }

    #[test]
    fn test_has_overlap() {
        let a = ResourceVector::fixed(2, 0, 0, 0);
        let b = ResourceVector::fixed(0, 1000, 0, 0);
        assert!(!a.has_overlap(&b));

        let c = ResourceVector::fixed(1, 500, 0, 0);
        assert!(a.has_overlap(&c));

        let d = with_gres(ResourceVector::new(), &[(3, 1)]);
        let e = with_gres(ResourceVector::new(), &[(3, 4)]);
        assert!(d.has_overlap(&e));
    }

    #[test]
    fn test_copy_and_adjust_procs() {
        let mut blocked = ResourceVector::fixed(0, 100, 0, 0);
        blocked.procs = ResourceAmount::All;
        let configured = ResourceVector::fixed(12, 64000, 0, 0);
        let out = ResourceVector::copy_and_adjust_procs(&blocked, &configured);
        assert_eq!(out.procs, ResourceAmount::Fixed(12));
        assert_eq!(out.mem, ResourceAmount::Fixed(100));
    }

    #[test]
    fn test_lower_bound_raises() {
        let mut a = ResourceVector::fixed(1, 500, 0, 9);
        let floor = ResourceVector::fixed(4, 100, 2, 0);
        a.lower_bound(&floor);
        assert_eq!(a, ResourceVector::fixed(4, 500, 2, 9));
    }
}
