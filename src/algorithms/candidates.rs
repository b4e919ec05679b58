use tracing::debug;

use crate::core::time_series::{mean_std, TimeSeries};

/// Tolerance for the `keep_normal_only` filter: a candidate passes when
/// its sample mean is within this of 0 and its sample standard
/// deviation within this of 1.
pub(crate) const NORMAL_EPSILON: f64 = 1e-2;

/// A candidate shapelet, identified by provenance; the values live in
/// the source series until a candidate is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Index of the source series in the dataset.
    pub series: usize,
    /// Offset of the window within the source series.
    pub start: usize,
    /// Window size.
    pub len: usize,
}

/// Enumerate candidate windows over the dataset.
///
/// Order is fixed and observable: window size ascending (stepped by
/// `stride`), then series in input order, then offset ascending
/// (stepped by `stride`). With `keep_normal_only`, windows that do not
/// look approximately z-normalised are skipped.
///
/// The caller has validated `min_size <= max_size <= L` and
/// `stride >= 1`.
pub(crate) fn enumerate(
    dataset: &[TimeSeries],
    min_size: usize,
    max_size: usize,
    stride: usize,
    keep_normal_only: bool,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut len = min_size;
    while len <= max_size {
        let before = out.len();
        for (series, ts) in dataset.iter().enumerate() {
            let mut start = 0;
            while start + len <= ts.len() {
                if !keep_normal_only || looks_normal(ts.window(start, len)) {
                    out.push(Candidate { series, start, len });
                }
                start += stride;
            }
        }
        debug!(window = len, candidates = out.len() - before, "enumerated window size");
        len += stride;
    }
    out
}

/// Whether a window looks approximately z-normalised.
fn looks_normal(window: &[f64]) -> bool {
    let (mean, std) = mean_std(window);
    mean.abs() <= NORMAL_EPSILON && (std - 1.0).abs() <= NORMAL_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(lengths: &[usize]) -> Vec<TimeSeries> {
        lengths
            .iter()
            .map(|&l| TimeSeries::new((0..l).map(|i| i as f64).collect(), false))
            .collect()
    }

    #[test]
    fn test_enumeration_order() {
        let data = dataset(&[4, 4]);
        let cands = enumerate(&data, 2, 3, 1, false);
        let expected = [
            // w = 2: series 0 offsets 0..=2, series 1 offsets 0..=2
            (0, 0, 2),
            (0, 1, 2),
            (0, 2, 2),
            (1, 0, 2),
            (1, 1, 2),
            (1, 2, 2),
            // w = 3
            (0, 0, 3),
            (0, 1, 3),
            (1, 0, 3),
            (1, 1, 3),
        ];
        let got: Vec<(usize, usize, usize)> =
            cands.iter().map(|c| (c.series, c.start, c.len)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_stride_applies_to_sizes_and_offsets() {
        let data = dataset(&[8]);
        let cands = enumerate(&data, 2, 6, 2, false);
        // Window sizes 2, 4, 6; offsets 0, 2, 4, ... while they fit
        let sizes: Vec<usize> = cands.iter().map(|c| c.len).collect();
        assert!(sizes.iter().all(|w| [2, 4, 6].contains(w)));
        for c in &cands {
            assert_eq!(c.start % 2, 0, "Offset {} not on the stride grid", c.start);
        }
        let count_w2 = cands.iter().filter(|c| c.len == 2).count();
        assert_eq!(count_w2, 4); // offsets 0, 2, 4, 6
    }

    #[test]
    fn test_candidate_count_formula() {
        // Without filtering and with stride 1, the count is
        // sum over w of (L - w + 1) * |series|.
        let data = dataset(&[6, 6, 6]);
        let cands = enumerate(&data, 2, 4, 1, false);
        let expected: usize = (2..=4).map(|w| (6 - w + 1) * 3).sum();
        assert_eq!(cands.len(), expected);
    }

    #[test]
    fn test_keep_normal_only_filters() {
        // [-1, 1] windows are exactly z-normalised; constant windows and
        // drifting ramps are not.
        let normalised = TimeSeries::new(vec![-1.0, 1.0, -1.0, 1.0], true);
        let constant = TimeSeries::new(vec![5.0; 4], false);
        let cands = enumerate(&[normalised, constant], 2, 2, 1, true);
        assert!(!cands.is_empty());
        assert!(
            cands.iter().all(|c| c.series == 0),
            "Constant-series windows must be filtered out"
        );
        // Offsets 0..=2 of the alternating series all qualify.
        assert_eq!(cands.len(), 3);
    }
}
