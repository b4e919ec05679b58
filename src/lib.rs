pub mod algorithms;
pub mod core;
pub mod error;
pub mod metrics;

pub use crate::algorithms::candidates::Candidate;
pub use crate::algorithms::mine::{
    mine, mine_with_cancel, MinerConfig, MiningOutcome, Shapelet, SignificantShapelet,
};
pub use crate::algorithms::tarone::TaroneState;
pub use crate::core::contingency::ContingencyTable;
pub use crate::core::distance_measure::DistanceMeasure;
pub use crate::core::lookup::MinPTable;
pub use crate::core::report::{ShapeletRecord, TableRecord};
pub use crate::core::time_series::TimeSeries;
pub use crate::error::{Error, Result};
pub use crate::metrics::euclidean::Euclidean;
pub use crate::metrics::minkowski::Minkowski;

/// High-level facade for significant shapelet mining, generic over the
/// distance measure.
///
/// Enumerates candidate subsequences over a range of window sizes,
/// scores each against the class labels through per-threshold
/// contingency tables, and keeps the shapelets whose Chi-squared
/// association survives Tarone's testability-aware multiple-testing
/// correction.
///
/// # Examples
///
/// ```
/// use shapelet_rs::{EuclideanMiner, Euclidean, MinerConfig, TimeSeries};
///
/// let dataset: Vec<TimeSeries> = (0..10)
///     .map(|i| {
///         let positive = i % 2 == 0;
///         let values = if positive {
///             vec![1.0, -1.0, 1.0, -1.0]
///         } else {
///             vec![0.0, 0.0, 0.0, 0.0]
///         };
///         TimeSeries::new(values, positive)
///     })
///     .collect();
///
/// let mut config = MinerConfig::window(4, 1);
/// config.alpha = 0.05;
/// let miner = EuclideanMiner::new(config, Euclidean);
/// let outcome = miner.mine(&dataset).unwrap();
/// assert!(outcome.complete);
/// assert!(!outcome.shapelets.is_empty());
/// ```
pub struct Miner<D: DistanceMeasure> {
    config: MinerConfig,
    measure: D,
}

impl<D: DistanceMeasure> Miner<D> {
    /// Create a new miner with the given configuration and distance
    /// measure.
    pub fn new(config: MinerConfig, measure: D) -> Self {
        Self { config, measure }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Reproducibility name of the distance measure, e.g. `Minkowski:2`.
    pub fn measure_name(&self) -> String {
        self.measure.name()
    }

    /// Run the extraction over a labeled dataset.
    pub fn mine(&self, dataset: &[TimeSeries]) -> Result<MiningOutcome> {
        mine(dataset, &self.measure, &self.config)
    }

    /// Run the extraction with a cooperative cancellation signal,
    /// checked between candidates.
    pub fn mine_with_cancel(
        &self,
        dataset: &[TimeSeries],
        cancel: &std::sync::atomic::AtomicBool,
    ) -> Result<MiningOutcome> {
        mine_with_cancel(dataset, &self.measure, &self.config, cancel)
    }
}

/// Convenience alias for the most common use case.
pub type EuclideanMiner = Miner<Euclidean>;

/// Convenience alias for mining with an arbitrary Minkowski exponent.
pub type MinkowskiMiner = Miner<Minkowski>;
