use crate::error::{Error, Result};

/// Trait for the distance functors used when matching shapelet
/// candidates against time series.
///
/// Implementations carry their own parameters (e.g. the Minkowski
/// exponent), so methods take `&self`. The closed set of measures lives
/// in [`crate::metrics`].
///
/// The default [`min_distance`](DistanceMeasure::min_distance) slides
/// `apply` over every window; measures with a cheaper formulation (the
/// Euclidean sum-of-squares/dot-product identity) override it, the same
/// way batch-optimized metrics override their profile computation.
pub trait DistanceMeasure: Clone + Send + Sync {
    /// Distance between two sequences of equal length.
    ///
    /// Returns a non-negative value. The true root is preserved (no
    /// squared-distance shortcut): thresholds derived from these values
    /// are reused across calls, so monotone-preserving substitutions are
    /// not sound here.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if the lengths differ.
    fn apply(&self, s: &[f64], t: &[f64]) -> Result<f64>;

    /// Minimum distance between `query` and any contiguous window of
    /// `series` with the query's length.
    ///
    /// This is the shapelet-to-series distance the mining driver uses.
    ///
    /// # Errors
    /// [`Error::ShapeMismatch`] if `series` is shorter than `query`, or
    /// if `query` is empty.
    fn min_distance(&self, query: &[f64], series: &[f64]) -> Result<f64> {
        check_window(query, series)?;
        let m = query.len();
        let mut best = f64::INFINITY;
        for start in 0..=series.len() - m {
            let d = self.apply(query, &series[start..start + m])?;
            if d < best {
                best = d;
            }
        }
        Ok(best)
    }

    /// Reproducibility name: the measure's name, followed by a colon and
    /// its parameter in shortest round-trip decimal form when it has one
    /// (e.g. `Minkowski:2`, never `Minkowski:2.000000`).
    fn name(&self) -> String;
}

/// Shared precondition for sliding a query over a series.
pub(crate) fn check_window(query: &[f64], series: &[f64]) -> Result<()> {
    if query.is_empty() || series.len() < query.len() {
        return Err(Error::ShapeMismatch {
            left: query.len(),
            right: series.len(),
        });
    }
    Ok(())
}
