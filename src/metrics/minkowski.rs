use crate::core::distance_measure::{check_window, DistanceMeasure};
use crate::error::{Error, Result};
use crate::metrics::euclidean;

/// Minkowski-p distance: `d_p(s, t) = (sum |s_i - t_i|^p)^(1/p)` for
/// `p > 0`.
///
/// `p == 1` (Manhattan) uses `abs()` instead of `powf()`, and the
/// shapelet-to-series distance for `p == 2` delegates to the Euclidean
/// dot-product fast path; other exponents fall back to the window
/// sweep.
#[derive(Debug, Clone)]
pub struct Minkowski {
    p: f64,
}

impl Minkowski {
    /// # Panics
    /// Panics unless `p` is finite and positive.
    pub fn new(p: f64) -> Self {
        assert!(p.is_finite() && p > 0.0, "Minkowski exponent must be positive, got {p}");
        Self { p }
    }

    /// The exponent.
    pub fn p(&self) -> f64 {
        self.p
    }

    #[inline]
    fn term(&self, a: f64, b: f64) -> f64 {
        if self.p == 1.0 {
            (a - b).abs()
        } else {
            (a - b).abs().powf(self.p)
        }
    }

    #[inline]
    fn root(&self, sum: f64) -> f64 {
        let sum = sum.max(0.0);
        if self.p == 1.0 {
            sum
        } else if self.p == 2.0 {
            sum.sqrt()
        } else {
            sum.powf(1.0 / self.p)
        }
    }
}

impl Default for Minkowski {
    /// The conventional exponent: Euclidean.
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl DistanceMeasure for Minkowski {
    fn apply(&self, s: &[f64], t: &[f64]) -> Result<f64> {
        if s.len() != t.len() {
            return Err(Error::ShapeMismatch {
                left: s.len(),
                right: t.len(),
            });
        }
        let sum: f64 = s.iter().zip(t).map(|(a, b)| self.term(*a, *b)).sum();
        Ok(self.root(sum))
    }

    fn min_distance(&self, query: &[f64], series: &[f64]) -> Result<f64> {
        if self.p == 2.0 {
            return euclidean::min_window_distance(query, series);
        }
        check_window(query, series)?;
        let m = query.len();
        let mut best = f64::INFINITY;
        for start in 0..=series.len() - m {
            let sum: f64 = query
                .iter()
                .zip(&series[start..start + m])
                .map(|(a, b)| self.term(*a, *b))
                .sum();
            if sum < best {
                best = sum;
            }
        }
        Ok(self.root(best))
    }

    /// E.g. `Minkowski:2`, with the exponent in shortest round-trip
    /// decimal form, not `Minkowski:2.000000`.
    fn name(&self) -> String {
        format!("Minkowski:{}", self.p)
    }
}
