use realfft::RealFftPlanner;

use crate::core::distance_measure::{check_window, DistanceMeasure};
use crate::error::{Error, Result};

/// Input size (`series len * query len`) above which the dot-product
/// profile switches to the FFT path. Below this the naive loop wins on
/// constant overhead.
const FFT_THRESHOLD: usize = 256 * 1024;

/// Euclidean distance (Minkowski with exponent 2).
///
/// The shapelet-to-series distance overrides the default window sweep
/// with the identity `d^2(q, w) = ssq(q) + ssq(w) - 2 * dot(q, w)`:
/// window sums of squares come from one prefix-sum pass and the dot
/// products from a sliding dot product, turning the O(L * w) sweep into
/// O(L) plus one dot-product profile.
#[derive(Debug, Clone, Default)]
pub struct Euclidean;

impl DistanceMeasure for Euclidean {
    fn apply(&self, s: &[f64], t: &[f64]) -> Result<f64> {
        if s.len() != t.len() {
            return Err(Error::ShapeMismatch {
                left: s.len(),
                right: t.len(),
            });
        }
        let sum: f64 = s.iter().zip(t).map(|(a, b)| (a - b) * (a - b)).sum();
        Ok(sum.max(0.0).sqrt())
    }

    fn min_distance(&self, query: &[f64], series: &[f64]) -> Result<f64> {
        min_window_distance(query, series)
    }

    fn name(&self) -> String {
        "Euclidean".to_string()
    }
}

/// Minimum Euclidean distance between `query` and every window of
/// `series` with the query's length, via the sum-of-squares /
/// dot-product identity. Shared with the Minkowski measure's `p == 2`
/// special case.
pub(crate) fn min_window_distance(query: &[f64], series: &[f64]) -> Result<f64> {
    check_window(query, series)?;
    let m = query.len();
    let n = series.len();

    let ssq_query: f64 = query.iter().map(|x| x * x).sum();

    // Window sums of squares from a prefix-sum pass
    let mut prefix_sq = vec![0.0; n + 1];
    for (i, &x) in series.iter().enumerate() {
        prefix_sq[i + 1] = prefix_sq[i] + x * x;
    }

    let dots = dot_profile(query, series);

    let mut best = f64::INFINITY;
    for (i, &qt) in dots.iter().enumerate() {
        let ssq_window = prefix_sq[i + m] - prefix_sq[i];
        // Clamp: rounding can push an exact match slightly negative
        let d = (ssq_query + ssq_window - 2.0 * qt).max(0.0).sqrt();
        if d < best {
            best = d;
        }
    }
    Ok(best)
}

/// Dot product of `query` against every window of `series`, dispatching
/// between the naive loop and FFT cross-correlation by input size.
fn dot_profile(query: &[f64], series: &[f64]) -> Vec<f64> {
    if series.len() * query.len() > FFT_THRESHOLD {
        dot_profile_fft(query, series)
    } else {
        dot_profile_naive(query, series)
    }
}

fn dot_profile_naive(query: &[f64], series: &[f64]) -> Vec<f64> {
    let m = query.len();
    (0..=series.len() - m)
        .map(|i| query.iter().zip(&series[i..i + m]).map(|(a, b)| a * b).sum())
        .collect()
}

/// O(n log n) dot-product profile: convolution of the reversed query
/// with the series via real-to-complex FFT.
fn dot_profile_fft(query: &[f64], series: &[f64]) -> Vec<f64> {
    let m = query.len();
    let n = series.len();
    let n_windows = n - m + 1;
    let fft_len = (n + m - 1).next_power_of_two();

    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut query_padded = vec![0.0; fft_len];
    for (i, &q) in query.iter().enumerate() {
        query_padded[m - 1 - i] = q;
    }
    let mut series_padded = vec![0.0; fft_len];
    series_padded[..n].copy_from_slice(series);

    let mut query_spectrum = forward.make_output_vec();
    let mut series_spectrum = forward.make_output_vec();
    forward.process(&mut query_padded, &mut query_spectrum).unwrap();
    forward.process(&mut series_padded, &mut series_spectrum).unwrap();

    for (q, s) in query_spectrum.iter_mut().zip(series_spectrum.iter()) {
        *q *= s;
    }

    let mut conv = vec![0.0; fft_len];
    inverse.process(&mut query_spectrum, &mut conv).unwrap();

    // realfft's inverse is unnormalized; the dot products sit at lags
    // m-1 .. m-1+n_windows of the convolution
    let norm = 1.0 / fft_len as f64;
    conv[m - 1..m - 1 + n_windows].iter().map(|&x| x * norm).collect()
}
