/// A binary-labeled time series: an ordered sequence of real-valued
/// samples plus a class bit.
///
/// Immutable after construction. All series participating in one mining
/// run must have equal length; the mining driver checks this before
/// enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    values: Vec<f64>,
    label: bool,
}

impl TimeSeries {
    /// Create a labeled series. `label = true` marks the positive class.
    pub fn new(values: Vec<f64>, label: bool) -> Self {
        Self { values, label }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw samples.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Class label bit.
    pub fn label(&self) -> bool {
        self.label
    }

    /// Contiguous window of length `len` starting at `start`.
    ///
    /// # Panics
    /// Panics if the window extends past the end of the series.
    pub fn window(&self, start: usize, len: usize) -> &[f64] {
        &self.values[start..start + len]
    }
}

/// Sample mean and (population) standard deviation of a window.
///
/// Single pass over the data; variance is clamped to zero so that
/// constant windows do not produce a tiny negative value under rounding.
pub(crate) fn mean_std(window: &[f64]) -> (f64, f64) {
    let m = window.len() as f64;
    let mean = window.iter().sum::<f64>() / m;
    let var = window.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / m;
    (mean, var.max(0.0).sqrt())
}
