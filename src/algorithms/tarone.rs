use tracing::debug;

use crate::core::lookup::MinPTable;

/// Running state of Tarone's testability adjustment.
///
/// Tracks the number of testable hypotheses `K` and the cut into the
/// ascending minimum-p table beyond which marginals are too skewed to
/// ever reach testability. Both are monotone: the cut only advances
/// (from the back of the sorted table) and the corrected threshold
/// `alpha / K` only tightens. The two values are coupled and must be
/// mutated together, which is why the state owns them both and exposes
/// a single [`process`](TaroneState::process) transition.
#[derive(Debug)]
pub struct TaroneState<'a> {
    alpha: f64,
    lookup: &'a MinPTable,
    testable: u64,
    cut: usize,
}

impl<'a> TaroneState<'a> {
    pub fn new(alpha: f64, lookup: &'a MinPTable) -> Self {
        Self {
            alpha,
            lookup,
            testable: 0,
            cut: 0,
        }
    }

    /// Target family-wise error rate before correction.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The current corrected significance threshold `alpha / K`
    /// (`alpha` itself while no hypothesis is testable).
    pub fn corrected_threshold(&self) -> f64 {
        if self.testable == 0 {
            self.alpha
        } else {
            self.alpha / self.testable as f64
        }
    }

    /// Minimum attainable p-value for an observed column marginal.
    pub fn min_attainable(&self, rs: usize) -> f64 {
        self.lookup.min_attainable(rs)
    }

    /// Feed one hypothesis with the given minimum attainable p-value.
    ///
    /// Returns whether the hypothesis is testable at the current
    /// corrected threshold. Testable hypotheses are counted and the
    /// testability cut is re-tightened; untestable ones leave the state
    /// untouched (and stay untestable forever, since the threshold only
    /// tightens).
    pub fn process(&mut self, min_p: f64) -> bool {
        if min_p > self.corrected_threshold() {
            return false;
        }
        self.testable += 1;
        let prefix = self.lookup.testable_prefix(self.alpha, self.testable);
        let cut = self.lookup.interior_len() - prefix;
        if cut > self.cut {
            debug!(
                testable = self.testable,
                cut, "testability threshold advanced"
            );
            self.cut = cut;
        }
        true
    }

    /// Number of testable hypotheses seen so far.
    pub fn testable_count(&self) -> u64 {
        self.testable
    }

    /// How far the testability cut has advanced from the back of the
    /// ascending minimum-p table.
    pub fn testability_cut(&self) -> usize {
        self.cut
    }
}
