use crate::core::contingency::ContingencyTable;

/// Precomputed minimum attainable p-values for one `(n, n1)` problem
/// instance.
///
/// Built once per mining run from a single [`ContingencyTable`] reused
/// with varying column marginal, then shared read-only. Two views are
/// kept: `by_rs` indexed by the observed marginal for O(1) testability
/// checks, and `sorted` ascending for the O(log n) testable-prefix
/// search that drives the Tarone adjustment. Smaller p-values sit at
/// the extremes of `rs`, so sorting is a pure reordering.
///
/// When `with_pseudocounts` is set the interior values are computed
/// against the inflated marginals (observed `rs` maps to cell marginal
/// `rs + 2`); the boundary values `m(0)` and `m(n)` are pinned to 1 in
/// both modes, since a threshold that splits nothing can never witness
/// association.
#[derive(Debug, Clone)]
pub struct MinPTable {
    by_rs: Vec<f64>,
    sorted: Vec<f64>,
}

impl MinPTable {
    /// Precompute the table for `n` instances with `n1` positives.
    ///
    /// # Panics
    /// Panics if `n1 > n`.
    pub fn new(n: usize, n1: usize, with_pseudocounts: bool) -> Self {
        let scratch = ContingencyTable::new(n, n1, 0.0, with_pseudocounts);
        let shift = if with_pseudocounts { 2 } else { 0 };

        let by_rs: Vec<f64> = (0..=n)
            .map(|rs| {
                if rs == 0 || rs == n {
                    1.0
                } else {
                    scratch.min_attainable_p_at(rs + shift)
                }
            })
            .collect();

        let mut sorted: Vec<f64> = by_rs[1..n.max(1)].to_vec();
        sorted.sort_unstable_by(f64::total_cmp);

        Self { by_rs, sorted }
    }

    /// Minimum attainable p-value for an observed column marginal.
    pub fn min_attainable(&self, rs: usize) -> f64 {
        self.by_rs.get(rs).copied().unwrap_or(1.0)
    }

    /// Number of interior entries (`m(1)` through `m(n-1)`).
    pub fn interior_len(&self) -> usize {
        self.sorted.len()
    }

    /// Number of leading entries of the ascending table that remain
    /// testable at level `alpha` with `count` testable hypotheses, i.e.
    /// the largest prefix where `m * count <= alpha`.
    pub fn testable_prefix(&self, alpha: f64, count: u64) -> usize {
        self.sorted
            .partition_point(|&m| m * count as f64 <= alpha)
    }
}
