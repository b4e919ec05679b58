use std::fmt;

use statrs::function::erf::erfc;

/// Upper-tail probability of a Chi-squared distribution with one degree
/// of freedom, evaluated at `t`.
///
/// Uses the identity `sf(t) = erfc(sqrt(t / 2))` instead of
/// `1 - cdf(t)`: the complementary error function keeps full relative
/// accuracy deep into the tail, where the subtraction would cancel to
/// zero long before the p-value itself underflows. Underflow clamps to
/// 0, overflow to 1.
pub(crate) fn chi2_survival(t: f64) -> f64 {
    if t <= 0.0 {
        return 1.0;
    }
    erfc((t / 2.0).sqrt()).clamp(0.0, 1.0)
}

/// A (partially) filled 2x2 contingency table under a fixed distance
/// threshold.
///
/// Cross-tabulates the class label against the predicate
/// `distance <= threshold`:
///
/// ```text
/// ----------------
/// | a  | b  | n1 |
/// |----|----|----|
/// | d  | c  | n0 |
/// |----|----|----|
/// | rs | qs | n  |
/// ----------------
/// ```
///
/// The dataset marginals `n`, `n1`, `n0` are fixed at construction;
/// each [`insert`](ContingencyTable::insert) advances exactly one cell.
/// With `with_pseudocounts` every cell starts at 1 and the marginals
/// are inflated by 4/2/2, which guarantees [`p`](ContingencyTable::p)
/// is always well defined.
#[derive(Debug, Clone)]
pub struct ContingencyTable {
    n: usize,
    n1: usize,
    n0: usize,
    a: usize,
    b: usize,
    c: usize,
    d: usize,
    threshold: f64,
}

impl ContingencyTable {
    /// Create an empty table for a dataset with `n` instances of which
    /// `n1` carry the positive label, under distance threshold
    /// `threshold`.
    ///
    /// # Panics
    /// Panics if `n1 > n`.
    pub fn new(n: usize, n1: usize, threshold: f64, with_pseudocounts: bool) -> Self {
        assert!(n1 <= n, "Class-1 count ({n1}) exceeds total count ({n})");
        let pad = usize::from(with_pseudocounts);
        Self {
            n: n + 4 * pad,
            n1: n1 + 2 * pad,
            n0: (n - n1) + 2 * pad,
            a: pad,
            b: pad,
            c: pad,
            d: pad,
            threshold,
        }
    }

    /// Insert one element with its distance to the candidate and its
    /// label. Exactly one cell is advanced.
    pub fn insert(&mut self, distance: f64, label: bool) {
        match (label, distance <= self.threshold) {
            (true, true) => self.a += 1,
            (true, false) => self.b += 1,
            (false, true) => self.d += 1,
            (false, false) => self.c += 1,
        }
    }

    // Marginals ------------------------------------------------------

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn n1(&self) -> usize {
        self.n1
    }

    pub fn n0(&self) -> usize {
        self.n0
    }

    /// Column marginal of the `distance <= threshold` side.
    pub fn rs(&self) -> usize {
        self.a + self.d
    }

    /// Column marginal of the `distance > threshold` side.
    pub fn qs(&self) -> usize {
        self.b + self.c
    }

    pub fn a(&self) -> usize {
        self.a
    }

    pub fn b(&self) -> usize {
        self.b
    }

    pub fn c(&self) -> usize {
        self.c
    }

    pub fn d(&self) -> usize {
        self.d
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether every dataset element has been inserted, i.e. the cells
    /// sum to the (possibly pseudocount-adjusted) total.
    pub fn complete(&self) -> bool {
        self.a + self.b + self.c + self.d == self.n
    }

    // p-values -------------------------------------------------------

    /// Pearson Chi-squared one-d.o.f. p-value of the filled table.
    ///
    /// Requires a complete table (debug-asserted). Returns 1 when a
    /// column marginal is empty, where the statistic is undefined.
    pub fn p(&self) -> f64 {
        debug_assert!(self.complete(), "p() requires a complete table");
        p_value(self.a, self.b, self.c, self.d, self.n, self.n1, self.n0)
    }

    /// Minimum attainable p-value for the table's current column
    /// marginal `rs`.
    pub fn min_attainable_p(&self) -> f64 {
        self.min_attainable_p_at(self.rs())
    }

    /// Minimum attainable p-value for a complete table with this `n`,
    /// `n1` and the given column marginal `rs` (cell-level, i.e.
    /// including any pseudocounts).
    ///
    /// The minimum is reached at one of the two extreme assignments of
    /// the `rs` elements: all positive or all negative, saturated by
    /// `n1` and `n0`. Both are evaluated and the smaller p wins. By
    /// convention `rs = 0` and `rs = n` yield 1.
    pub fn min_attainable_p_at(&self, rs: usize) -> f64 {
        if rs == 0 || rs >= self.n {
            return 1.0;
        }
        let a = rs.min(self.n1);
        let d = rs - a;
        let left = p_value(a, self.n1 - a, self.n0 - d, d, self.n, self.n1, self.n0);

        let d = rs.min(self.n0);
        let a = rs - d;
        let right = p_value(a, self.n1 - a, self.n0 - d, d, self.n, self.n1, self.n0);

        left.min(right)
    }

    /// Minimum optimistic p-value of an incomplete table: the smallest
    /// p-value reachable by distributing the remaining instances in the
    /// most favourable way.
    ///
    /// Two virtual completions are considered: all remaining positives
    /// inside the threshold with all remaining negatives outside, and
    /// the opposite extreme. On a complete table this degenerates to
    /// [`p`](ContingencyTable::p) itself.
    pub fn min_optimistic_p(&self) -> f64 {
        debug_assert!(
            self.a + self.b <= self.n1 && self.c + self.d <= self.n0,
            "more elements inserted than the declared marginals allow"
        );
        let rem1 = self.n1 - (self.a + self.b);
        let rem0 = self.n0 - (self.c + self.d);

        let aligned = p_value(
            self.a + rem1,
            self.b,
            self.c + rem0,
            self.d,
            self.n,
            self.n1,
            self.n0,
        );
        let inverted = p_value(
            self.a,
            self.b + rem1,
            self.c,
            self.d + rem0,
            self.n,
            self.n1,
            self.n0,
        );
        aligned.min(inverted)
    }
}

/// Chi-squared p-value of a virtual completed table given all four
/// cells and the fixed marginals.
fn p_value(a: usize, b: usize, c: usize, d: usize, n: usize, n1: usize, n0: usize) -> f64 {
    let rs = a + d;
    let qs = b + c;
    if rs == 0 || qs == 0 || n1 == 0 || n0 == 0 {
        return 1.0;
    }
    let cross = a as f64 * c as f64 - b as f64 * d as f64;
    let t = n as f64 * cross * cross / (n1 as f64 * n0 as f64 * rs as f64 * qs as f64);
    chi2_survival(t)
}

/// Tables are equal when their cell values are equal; the threshold the
/// cells were collected under is not compared.
impl PartialEq for ContingencyTable {
    fn eq(&self, other: &Self) -> bool {
        self.a == other.a && self.b == other.b && self.c == other.c && self.d == other.d
    }
}

/// Reported as `a, b, d, c`, matching the visual column order of the
/// table.
impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.a, self.b, self.d, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statrs::distribution::{ChiSquared, ContinuousCDF};

    fn filled(n: usize, n1: usize, tau: f64, pseudo: bool, rows: &[(f64, bool)]) -> ContingencyTable {
        let mut t = ContingencyTable::new(n, n1, tau, pseudo);
        for &(dist, label) in rows {
            t.insert(dist, label);
        }
        t
    }

    #[test]
    fn test_insert_advances_one_cell() {
        let mut t = ContingencyTable::new(4, 2, 1.0, false);
        t.insert(0.5, true); // a
        t.insert(2.0, true); // b
        t.insert(0.5, false); // d
        t.insert(2.0, false); // c
        assert_eq!((t.a(), t.b(), t.c(), t.d()), (1, 1, 1, 1));
        assert!(t.complete());
        assert_eq!(t.rs(), 2);
        assert_eq!(t.qs(), 2);
    }

    #[test]
    fn test_marginal_invariants() {
        let t = filled(
            6,
            3,
            1.0,
            false,
            &[
                (0.1, true),
                (0.2, true),
                (3.0, true),
                (0.3, false),
                (4.0, false),
                (5.0, false),
            ],
        );
        assert!(t.complete());
        assert_eq!(t.a() + t.b(), t.n1());
        assert_eq!(t.c() + t.d(), t.n0());
        assert_eq!(t.a() + t.b() + t.c() + t.d(), t.n());
    }

    #[test]
    fn test_pseudocount_inflation() {
        let t = ContingencyTable::new(10, 4, 1.0, true);
        assert_eq!(t.n(), 14);
        assert_eq!(t.n1(), 6);
        assert_eq!(t.n0(), 8);
        assert_eq!((t.a(), t.b(), t.c(), t.d()), (1, 1, 1, 1));
        // 4 pseudo cells already inserted; 10 real elements to go
        assert!(!t.complete());
    }

    #[test]
    fn test_p_perfect_separation_hand_computed() {
        // 20 instances, 10 per class, perfectly split by the threshold:
        // a=10, b=0, c=10, d=0 -> t = 20*(100)^2/(10*10*10*10) = 20
        let rows: Vec<(f64, bool)> = (0..10)
            .map(|_| (0.0, true))
            .chain((0..10).map(|_| (9.0, false)))
            .collect();
        let t = filled(20, 10, 1.0, false, &rows);
        let p = t.p();
        let expected = chi2_survival(20.0);
        assert!(
            (p - expected).abs() < 1e-18,
            "Expected survival at t=20, got {p}"
        );
        assert!(p < 1e-5 && p > 1e-6, "sf(20) is about 7.7e-6, got {p}");
    }

    #[test]
    fn test_p_no_association_is_one() {
        // Balanced table a=1,b=1,c=1,d=1: cross term 0 -> t=0 -> p=1
        let t = filled(
            4,
            2,
            1.0,
            false,
            &[(0.5, true), (2.0, true), (0.5, false), (2.0, false)],
        );
        assert_eq!(t.p(), 1.0);
    }

    #[test]
    fn test_p_empty_column_is_one() {
        // Everything inside the threshold: qs = 0
        let t = filled(4, 2, 10.0, false, &[(1.0, true), (2.0, true), (1.0, false), (2.0, false)]);
        assert_eq!(t.qs(), 0);
        assert_eq!(t.p(), 1.0);
    }

    #[test]
    fn test_survival_matches_statrs_cdf() {
        // Cross-check erfc formulation against the distribution CDF at
        // moderate statistics where 1 - cdf is still accurate.
        let chi2 = ChiSquared::new(1.0).expect("freedom = 1");
        for t in [0.1, 0.5, 1.0, 2.0, 3.84, 6.63, 10.83, 20.0] {
            let via_erfc = chi2_survival(t);
            let via_cdf = 1.0 - chi2.cdf(t);
            assert!(
                (via_erfc - via_cdf).abs() < 1e-10,
                "Survival mismatch at t={t}: erfc={via_erfc}, cdf={via_cdf}"
            );
        }
    }

    #[test]
    fn test_survival_deep_tail_does_not_cancel_to_zero() {
        // 1 - cdf would already be 0 here; the erfc path still resolves.
        let p = chi2_survival(200.0);
        assert!(p > 0.0 && p < 1e-40, "Deep-tail survival lost: {p}");
        // And the clamp handles genuine underflow.
        assert_eq!(chi2_survival(5000.0), 0.0);
    }

    #[test]
    fn test_min_attainable_extremes_are_one() {
        let t = ContingencyTable::new(10, 4, 1.0, false);
        assert_eq!(t.min_attainable_p_at(0), 1.0);
        assert_eq!(t.min_attainable_p_at(10), 1.0);
    }

    #[test]
    fn test_min_attainable_evaluates_both_extremes() {
        // n=10, n1=3: at rs=7 the all-negative assignment (d=7) is the
        // achievable extreme on the right; the left one saturates at
        // a=3, d=4. The reported value must be the smaller p of the two.
        let t = ContingencyTable::new(10, 3, 1.0, false);
        let left = {
            // a=3, b=0, d=4, c=3
            let cross = 3.0 * 3.0 - 0.0 * 4.0;
            chi2_survival(10.0 * cross * cross / (3.0 * 7.0 * 7.0 * 3.0))
        };
        let right = {
            // d=7, a=0, b=3, c=0
            let cross = 0.0 * 0.0 - 3.0 * 7.0;
            chi2_survival(10.0 * cross * cross / (3.0 * 7.0 * 7.0 * 3.0))
        };
        let m = t.min_attainable_p_at(7);
        assert!(
            (m - left.min(right)).abs() < 1e-15,
            "Expected min of both extremes ({left}, {right}), got {m}"
        );
    }

    #[test]
    fn test_min_attainable_no_smaller_than_any_table() {
        // Every complete table with the same rs must have p >= m(rs).
        let n = 8;
        let n1 = 4;
        let probe = ContingencyTable::new(n, n1, 1.0, false);
        for rs in 1..n {
            let m = probe.min_attainable_p_at(rs);
            for a in rs.saturating_sub(n - n1)..=rs.min(n1) {
                let d = rs - a;
                let rows: Vec<(f64, bool)> = (0..a)
                    .map(|_| (0.0, true))
                    .chain((0..n1 - a).map(|_| (9.0, true)))
                    .chain((0..d).map(|_| (0.0, false)))
                    .chain((0..(n - n1) - d).map(|_| (9.0, false)))
                    .collect();
                let t = filled(n, n1, 1.0, false, &rows);
                assert_eq!(t.rs(), rs);
                assert!(
                    t.p() >= m - 1e-15,
                    "p={} below min attainable {m} at rs={rs}, a={a}",
                    t.p()
                );
            }
        }
    }

    #[test]
    fn test_min_optimistic_lower_bounds_final_p() {
        // Invariant: at every prefix of the insertion sequence, the
        // optimistic bound never exceeds the completed table's p.
        let rows = [
            (0.1, true),
            (5.0, true),
            (0.2, true),
            (0.3, false),
            (6.0, false),
            (7.0, false),
            (0.4, true),
            (8.0, false),
        ];
        for pseudo in [false, true] {
            let mut t = ContingencyTable::new(8, 4, 1.0, pseudo);
            let mut bounds = Vec::new();
            for &(dist, label) in &rows {
                t.insert(dist, label);
                bounds.push(t.min_optimistic_p());
            }
            assert!(t.complete());
            let final_p = t.p();
            for (i, bound) in bounds.iter().enumerate() {
                assert!(
                    *bound <= final_p + 1e-15,
                    "Optimistic bound {bound} at step {i} exceeds final p {final_p} (pseudo={pseudo})"
                );
            }
            // On the complete table the bound collapses to p itself.
            assert!((bounds.last().unwrap() - final_p).abs() < 1e-15);
        }
    }

    #[test]
    fn test_label_swap_preserves_p() {
        // 2x2 Chi-squared symmetry: swapping the classes permutes the
        // cells but leaves the p-value unchanged.
        let rows = [
            (0.1, true),
            (5.0, true),
            (0.2, false),
            (0.3, false),
            (6.0, false),
            (0.4, true),
        ];
        let t = filled(6, 3, 1.0, false, &rows);
        let swapped: Vec<(f64, bool)> = rows.iter().map(|&(d, l)| (d, !l)).collect();
        let s = filled(6, 3, 1.0, false, &swapped);
        assert_eq!((t.a(), t.b()), (s.d(), s.c()));
        assert!((t.p() - s.p()).abs() < 1e-15);
    }

    #[test]
    fn test_equality_ignores_threshold() {
        let x = filled(2, 1, 1.0, false, &[(0.5, true), (2.0, false)]);
        let y = filled(2, 1, 0.7, false, &[(0.5, true), (2.0, false)]);
        assert_eq!(x, y);
    }

    #[test]
    fn test_display_column_order() {
        // a=2, b=1, d=1, c=2
        let t = filled(
            6,
            3,
            1.0,
            false,
            &[
                (0.1, true),
                (0.2, true),
                (5.0, true),
                (0.3, false),
                (6.0, false),
                (7.0, false),
            ],
        );
        assert_eq!(t.to_string(), "2, 1, 1, 2");
    }
}
