use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::algorithms::candidates::{self, Candidate};
use crate::algorithms::tarone::TaroneState;
use crate::core::contingency::ContingencyTable;
use crate::core::distance_measure::DistanceMeasure;
use crate::core::lookup::MinPTable;
use crate::core::time_series::TimeSeries;
use crate::error::{Error, Result};

/// Minimum candidate count before the batched parallel path is worth
/// its synchronisation overhead.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_CANDIDATES: usize = 256;

/// Candidates per parallel batch. The Tarone state is folded once per
/// batch, in candidate order, so the batch size affects only how stale
/// the speculative pruning bound may get, never the output.
#[cfg(feature = "parallel")]
const PARALLEL_BATCH: usize = 128;

/// Mining parameters.
///
/// Plain data: construct with [`MinerConfig::new`] (or
/// [`MinerConfig::window`] for a single window size) and set the flag
/// fields directly.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Smallest window size (inclusive).
    pub min_size: usize,
    /// Largest window size (inclusive).
    pub max_size: usize,
    /// Step for both window growth and window offset.
    pub stride: usize,
    /// Target family-wise error rate before Tarone correction.
    pub alpha: f64,
    /// Initialise every contingency-table cell to 1 so no marginal can
    /// be zero.
    pub pseudocounts: bool,
    /// Compute the minimum-p lookup table against the nominal `n`/`n1`
    /// even when `pseudocounts` inflates the mining tables.
    pub nominal_lookup: bool,
    /// Cap the evaluated distance thresholds at
    /// `max(distances) / sqrt(window)`.
    pub default_factor: bool,
    /// Suppress the optimistic-bound early exits while filling tables.
    pub disable_pruning: bool,
    /// Skip candidates that do not look approximately z-normalised.
    pub keep_normal_only: bool,
    /// Report only one shapelet per distinct contingency table.
    pub merge_tables: bool,
    /// Suppress shapelets whose numeric content repeats an earlier one.
    pub remove_duplicates: bool,
    /// Emit every candidate regardless of significance. Implies
    /// `disable_pruning`, so the traversal order is preserved.
    pub report_all_shapelets: bool,
}

impl MinerConfig {
    pub fn new(min_size: usize, max_size: usize, stride: usize) -> Self {
        Self {
            min_size,
            max_size,
            stride,
            alpha: 0.01,
            pseudocounts: false,
            nominal_lookup: false,
            default_factor: false,
            disable_pruning: false,
            keep_normal_only: false,
            merge_tables: false,
            remove_duplicates: false,
            report_all_shapelets: false,
        }
    }

    /// Single fixed window size.
    pub fn window(size: usize, stride: usize) -> Self {
        Self::new(size, size, stride)
    }
}

/// A contiguous subsequence extracted from a source series, by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Shapelet {
    pub values: Vec<f64>,
    /// Index of the source series.
    pub series: usize,
    /// Offset within the source series.
    pub start: usize,
}

/// One mining result: a shapelet, its p-value and its best contingency
/// table.
#[derive(Debug, Clone)]
pub struct SignificantShapelet {
    pub shapelet: Shapelet,
    pub p: f64,
    pub table: ContingencyTable,
}

/// Result of a mining run.
#[derive(Debug, Clone)]
pub struct MiningOutcome {
    /// Sorted by p ascending, ties by window size, then source order.
    pub shapelets: Vec<SignificantShapelet>,
    /// The final Tarone-corrected significance threshold `alpha / K`.
    pub corrected_threshold: f64,
    /// Every distance threshold evaluated, per candidate in traversal
    /// order, for introspection of the threshold-selection recipe.
    pub thresholds: Vec<f64>,
    /// False when the run was cancelled and the result is partial.
    pub complete: bool,
}

/// Mine significant shapelets from a binary-labeled dataset.
///
/// See [`mine_with_cancel`] for the cooperative-cancellation variant.
pub fn mine<D: DistanceMeasure>(
    dataset: &[TimeSeries],
    measure: &D,
    config: &MinerConfig,
) -> Result<MiningOutcome> {
    mine_with_cancel(dataset, measure, config, &AtomicBool::new(false))
}

/// Mine significant shapelets, checking `cancel` between candidates.
///
/// On cancellation the partial result is shaped and returned with
/// [`MiningOutcome::complete`] set to `false`.
///
/// # Errors
/// [`Error::InvalidInput`] for an empty dataset, unequal series
/// lengths, non-finite samples, or out-of-range mining parameters,
/// all detected before enumeration. A dataset whose labels are all
/// identical is not an error: it yields an empty result at the
/// uncorrected threshold.
pub fn mine_with_cancel<D: DistanceMeasure>(
    dataset: &[TimeSeries],
    measure: &D,
    config: &MinerConfig,
    cancel: &AtomicBool,
) -> Result<MiningOutcome> {
    validate(dataset, config)?;

    let report_all = config.report_all_shapelets;
    let n = dataset.len();
    let n1 = dataset.iter().filter(|ts| ts.label()).count();
    debug!(
        n,
        n1,
        measure = %measure.name(),
        min_size = config.min_size,
        max_size = config.max_size,
        "mining start"
    );

    if (n1 == 0 || n1 == n) && !report_all {
        warn!("all labels identical: no table can witness association, returning empty result");
        return Ok(MiningOutcome {
            shapelets: Vec::new(),
            corrected_threshold: config.alpha,
            thresholds: Vec::new(),
            complete: true,
        });
    }

    let lookup = MinPTable::new(n, n1, config.pseudocounts && !config.nominal_lookup);
    let ctx = MineCtx {
        dataset,
        measure,
        config,
        lookup: &lookup,
        n1,
        prune: !config.disable_pruning && !report_all,
        report_all,
    };

    let cands = candidates::enumerate(
        dataset,
        config.min_size,
        config.max_size,
        config.stride,
        config.keep_normal_only,
    );

    let mut tarone = TaroneState::new(config.alpha, &lookup);
    let mut records: Vec<SignificantShapelet> = Vec::new();
    let mut thresholds_out: Vec<f64> = Vec::new();

    #[cfg(feature = "parallel")]
    let complete = if cands.len() >= MIN_PARALLEL_CANDIDATES {
        run_batched(&ctx, &cands, cancel, &mut tarone, &mut records, &mut thresholds_out)?
    } else {
        run_serial(&ctx, &cands, cancel, &mut tarone, &mut records, &mut thresholds_out)?
    };
    #[cfg(not(feature = "parallel"))]
    let complete = run_serial(&ctx, &cands, cancel, &mut tarone, &mut records, &mut thresholds_out)?;

    let corrected_threshold = tarone.corrected_threshold();
    let shapelets = shape_output(records, config, corrected_threshold);
    debug!(
        significant = shapelets.len(),
        testable = tarone.testable_count(),
        threshold = corrected_threshold,
        "mining finished"
    );
    Ok(MiningOutcome {
        shapelets,
        corrected_threshold,
        thresholds: thresholds_out,
        complete,
    })
}

/// Everything an evaluation needs that is fixed for the whole run.
struct MineCtx<'a, D: DistanceMeasure> {
    dataset: &'a [TimeSeries],
    measure: &'a D,
    config: &'a MinerConfig,
    lookup: &'a MinPTable,
    n1: usize,
    prune: bool,
    report_all: bool,
}

/// Per-threshold evaluation of one candidate. `filled` is the completed
/// table and its p-value; it is absent when the threshold was skipped
/// as untestable or the table was pruned.
struct ThresholdEval {
    rs: usize,
    filled: Option<(ContingencyTable, f64)>,
}

struct CandidateEval {
    candidate: Candidate,
    thresholds: Vec<f64>,
    evals: Vec<ThresholdEval>,
}

fn run_serial<D: DistanceMeasure>(
    ctx: &MineCtx<'_, D>,
    cands: &[Candidate],
    cancel: &AtomicBool,
    tarone: &mut TaroneState<'_>,
    records: &mut Vec<SignificantShapelet>,
    thresholds_out: &mut Vec<f64>,
) -> Result<bool> {
    for candidate in cands {
        if cancel.load(Ordering::Relaxed) {
            return Ok(false);
        }
        let eval = evaluate_candidate(ctx, candidate, tarone.corrected_threshold())?;
        fold_candidate(ctx, eval, tarone, records, thresholds_out);
    }
    Ok(true)
}

/// Parallel traversal: each batch is evaluated concurrently against the
/// corrected threshold frozen at batch entry (an upper bound on the
/// true running value, so speculative pruning stays sound), then folded
/// into the Tarone state sequentially in candidate order. The fold
/// replays exactly the serial testability sequence, so serial and
/// parallel runs produce identical output.
#[cfg(feature = "parallel")]
fn run_batched<D: DistanceMeasure>(
    ctx: &MineCtx<'_, D>,
    cands: &[Candidate],
    cancel: &AtomicBool,
    tarone: &mut TaroneState<'_>,
    records: &mut Vec<SignificantShapelet>,
    thresholds_out: &mut Vec<f64>,
) -> Result<bool> {
    use rayon::prelude::*;

    for chunk in cands.chunks(PARALLEL_BATCH) {
        if cancel.load(Ordering::Relaxed) {
            return Ok(false);
        }
        let frozen = tarone.corrected_threshold();
        let evals: Vec<CandidateEval> = chunk
            .par_iter()
            .map(|candidate| evaluate_candidate(ctx, candidate, frozen))
            .collect::<Result<_>>()?;
        for eval in evals {
            fold_candidate(ctx, eval, tarone, records, thresholds_out);
        }
    }
    Ok(true)
}

/// Distance vector, threshold set, and per-threshold tables for one
/// candidate. `bound` is the corrected threshold the evaluation may
/// assume; it must never be below the true running value.
fn evaluate_candidate<D: DistanceMeasure>(
    ctx: &MineCtx<'_, D>,
    candidate: &Candidate,
    bound: f64,
) -> Result<CandidateEval> {
    let query = ctx.dataset[candidate.series].window(candidate.start, candidate.len);

    let mut distances = Vec::with_capacity(ctx.dataset.len());
    for ts in ctx.dataset {
        distances.push(ctx.measure.min_distance(query, ts.values())?);
    }

    let thresholds = threshold_set(&distances, candidate.len, ctx.config.default_factor);

    let mut evals = Vec::with_capacity(thresholds.len());
    for &tau in &thresholds {
        let rs = distances.iter().filter(|&&d| d <= tau).count();
        // Untestable marginals can never become testable again; skip
        // the fill unless every candidate is being reported.
        let worth_filling = ctx.report_all || ctx.lookup.min_attainable(rs) <= bound;
        let filled = if worth_filling {
            fill_table(ctx, &distances, tau, if ctx.prune { Some(bound) } else { None })
        } else {
            None
        };
        evals.push(ThresholdEval { rs, filled });
    }

    Ok(CandidateEval {
        candidate: *candidate,
        thresholds,
        evals,
    })
}

/// Fill one contingency table in input order, optionally abandoning it
/// as soon as its optimistic bound can no longer beat `prune_bound`.
fn fill_table<D: DistanceMeasure>(
    ctx: &MineCtx<'_, D>,
    distances: &[f64],
    tau: f64,
    prune_bound: Option<f64>,
) -> Option<(ContingencyTable, f64)> {
    let mut table = ContingencyTable::new(
        ctx.dataset.len(),
        ctx.n1,
        tau,
        ctx.config.pseudocounts,
    );
    match prune_bound {
        Some(bound) => {
            for (ts, &dist) in ctx.dataset.iter().zip(distances) {
                table.insert(dist, ts.label());
                if table.min_optimistic_p() > bound {
                    return None;
                }
            }
        }
        None => {
            for (ts, &dist) in ctx.dataset.iter().zip(distances) {
                table.insert(dist, ts.label());
            }
        }
    }
    debug_assert!(table.complete());
    let p = table.p();
    Some((table, p))
}

/// Advance the Tarone state over one candidate's thresholds and record
/// the candidate's best table, if any is eligible.
///
/// Eligibility requires testability and a p-value within the corrected
/// threshold at evaluation time (every complete table is eligible under
/// `report_all`). Ties between thresholds keep the first evaluated,
/// i.e. the smallest threshold.
fn fold_candidate<D: DistanceMeasure>(
    ctx: &MineCtx<'_, D>,
    eval: CandidateEval,
    tarone: &mut TaroneState<'_>,
    records: &mut Vec<SignificantShapelet>,
    thresholds_out: &mut Vec<f64>,
) {
    thresholds_out.extend_from_slice(&eval.thresholds);

    let mut best: Option<(f64, ContingencyTable)> = None;
    for te in eval.evals {
        let min_p = tarone.min_attainable(te.rs);
        let testable = tarone.process(min_p);
        if let Some((table, p)) = te.filled {
            let eligible = ctx.report_all || (testable && p <= tarone.corrected_threshold());
            if eligible && best.as_ref().map_or(true, |(bp, _)| p < *bp) {
                best = Some((p, table));
            }
        }
    }

    if let Some((p, table)) = best {
        let c = eval.candidate;
        records.push(SignificantShapelet {
            shapelet: Shapelet {
                values: ctx.dataset[c.series].window(c.start, c.len).to_vec(),
                series: c.series,
                start: c.start,
            },
            p,
            table,
        });
    }
}

/// The distance thresholds to evaluate for one candidate: the distinct
/// distances plus the midpoint of every consecutive pair, so that each
/// possible split of the dataset is represented. With `default_factor`
/// the set is capped at `max(distances) / sqrt(window)`.
fn threshold_set(distances: &[f64], window: usize, default_factor: bool) -> Vec<f64> {
    let mut distinct = distances.to_vec();
    distinct.sort_unstable_by(f64::total_cmp);
    distinct.dedup();

    let mut out = Vec::with_capacity(distinct.len() * 2);
    for (i, &value) in distinct.iter().enumerate() {
        out.push(value);
        if let Some(&next) = distinct.get(i + 1) {
            out.push(value + (next - value) / 2.0);
        }
    }

    if default_factor {
        if let Some(&largest) = distinct.last() {
            let cap = largest / (window as f64).sqrt();
            out.retain(|&tau| tau <= cap);
        }
    }
    out
}

/// Final output shaping: the significance filter against the final
/// corrected threshold, the deterministic sort, and the optional
/// deduplication passes.
fn shape_output(
    mut records: Vec<SignificantShapelet>,
    config: &MinerConfig,
    corrected_threshold: f64,
) -> Vec<SignificantShapelet> {
    if !config.report_all_shapelets {
        records.retain(|r| r.p <= corrected_threshold);
    }

    records.sort_by(|x, y| {
        x.p.total_cmp(&y.p)
            .then(x.shapelet.values.len().cmp(&y.shapelet.values.len()))
            .then(x.shapelet.series.cmp(&y.shapelet.series))
            .then(x.shapelet.start.cmp(&y.shapelet.start))
    });

    if config.merge_tables {
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert([r.table.a(), r.table.b(), r.table.c(), r.table.d()]));
    }

    if config.remove_duplicates {
        let mut seen: HashSet<Vec<u64>> = HashSet::new();
        records.retain(|r| {
            seen.insert(r.shapelet.values.iter().map(|v| v.to_bits()).collect())
        });
    }

    records
}

fn validate(dataset: &[TimeSeries], config: &MinerConfig) -> Result<()> {
    if dataset.is_empty() {
        return Err(Error::InvalidInput("dataset is empty".to_string()));
    }
    let len = dataset[0].len();
    if len == 0 {
        return Err(Error::InvalidInput("series are empty".to_string()));
    }
    for (i, ts) in dataset.iter().enumerate() {
        if ts.len() != len {
            return Err(Error::InvalidInput(format!(
                "series {i} has length {}, expected {len}",
                ts.len()
            )));
        }
        if ts.values().iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "series {i} contains non-finite samples"
            )));
        }
    }
    if config.min_size == 0 {
        return Err(Error::InvalidInput("min_size must be at least 1".to_string()));
    }
    if config.min_size > config.max_size {
        return Err(Error::InvalidInput(format!(
            "min_size ({}) exceeds max_size ({})",
            config.min_size, config.max_size
        )));
    }
    if config.max_size > len {
        return Err(Error::InvalidInput(format!(
            "max_size ({}) exceeds series length ({len})",
            config.max_size
        )));
    }
    if config.stride == 0 {
        return Err(Error::InvalidInput("stride must be at least 1".to_string()));
    }
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(Error::InvalidInput(format!(
            "alpha must lie in (0, 1), got {}",
            config.alpha
        )));
    }
    Ok(())
}
