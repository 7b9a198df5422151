//! Search for the richness threshold whose hotspots cover a target fraction of the land area.
//!
//! The coverage `C(t)` of a threshold `t` is the fraction of the data cells with a richness of at least `t`.
//! `C(t)` never increases with `t`, the search relies on this to maintain a bracket around the target.

use std::ops::RangeInclusive;

use geo::{
    Array,
    raster::algo::{self, QuantileInterpolation},
};
use num::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{ContiguityFilter, Error, Result, SearchConfig, config::validate_coverage};

const COVERAGE_EPSILON: f64 = 1e-12;

fn default_scan_radius() -> u32 {
    5
}

/// How the candidate thresholds are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Secant steps inside a shrinking bracket around the target coverage
    #[default]
    Bracketing,
    /// Evaluates the initial threshold and its neighbours up to `radius` steps away
    NeighborhoodScan {
        #[serde(default = "default_scan_radius")]
        radius: u32,
    },
}

/// Which of the evaluated thresholds is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// The highest threshold that still covers at least the target,
    /// the threshold with the highest coverage when none reaches the target
    #[default]
    AtLeastTarget,
    /// The threshold with the smallest coverage error.
    /// On a tie the coverage above the target wins, then the lowest threshold.
    Closest,
}

/// The cells counted in the coverage of a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageBasis {
    /// All the cells at or above the threshold
    #[default]
    Candidate,
    /// The cells at or above the threshold that survive the contiguity filter
    Filtered,
}

impl CoverageBasis {
    /// When the coverage is measured relative to the contiguity filter
    pub fn describe(self) -> &'static str {
        match self {
            CoverageBasis::Candidate => "before filtering",
            CoverageBasis::Filtered => "after filtering",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEvaluation {
    pub threshold: i64,
    /// Number of cells counted in the coverage
    pub cells: usize,
    /// Fraction of the data cells
    pub coverage: f64,
}

/// Result of a threshold search
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSearch {
    pub threshold: i64,
    pub coverage: f64,
    pub target: f64,
    pub initial_threshold: i64,
    /// Number of evaluated thresholds
    pub iterations: usize,
    /// The selected coverage is within the tolerance of the target
    pub converged: bool,
    /// All the evaluated thresholds in evaluation order
    pub evaluations: Vec<ThresholdEvaluation>,
}

impl ThresholdSearch {
    pub fn coverage_error(&self) -> f64 {
        self.coverage - self.target
    }
}

fn reaches_target(coverage: f64, target: f64) -> bool {
    coverage >= target - COVERAGE_EPSILON
}

fn within_tolerance(coverage: f64, target: f64, tolerance: f64) -> bool {
    (coverage - target).abs() <= tolerance + COVERAGE_EPSILON
}

impl SelectionPolicy {
    fn favors(self, coverage: f64, target: f64) -> bool {
        match self {
            SelectionPolicy::AtLeastTarget => reaches_target(coverage, target),
            SelectionPolicy::Closest => true,
        }
    }

    /// Picks the best evaluation for the target coverage, `None` when nothing was evaluated
    pub fn select(self, evaluations: &[ThresholdEvaluation], target: f64) -> Option<&ThresholdEvaluation> {
        match self {
            SelectionPolicy::AtLeastTarget => evaluations
                .iter()
                .filter(|e| reaches_target(e.coverage, target))
                .max_by_key(|e| e.threshold)
                .or_else(|| {
                    evaluations
                        .iter()
                        .max_by(|a, b| a.coverage.total_cmp(&b.coverage).then(b.threshold.cmp(&a.threshold)))
                }),
            SelectionPolicy::Closest => evaluations.iter().min_by(|a, b| {
                let error_a = (a.coverage - target).abs();
                let error_b = (b.coverage - target).abs();

                let by_error = if (error_a - error_b).abs() <= COVERAGE_EPSILON {
                    std::cmp::Ordering::Equal
                } else {
                    error_a.total_cmp(&error_b)
                };

                by_error
                    .then_with(|| reaches_target(b.coverage, target).cmp(&reaches_target(a.coverage, target)))
                    .then_with(|| a.threshold.cmp(&b.threshold))
            }),
        }
    }
}

/// Evaluates and remembers the coverage of thresholds
struct CoverageEvaluator<F> {
    data_cells: usize,
    cells_at: F,
    evaluations: Vec<ThresholdEvaluation>,
}

impl<F> CoverageEvaluator<F>
where
    F: FnMut(i64) -> Result<usize>,
{
    fn evaluated(&self, threshold: i64) -> Option<ThresholdEvaluation> {
        self.evaluations.iter().find(|e| e.threshold == threshold).copied()
    }

    fn count(&self) -> usize {
        self.evaluations.len()
    }

    fn evaluate(&mut self, threshold: i64) -> Result<ThresholdEvaluation> {
        if let Some(evaluation) = self.evaluated(threshold) {
            return Ok(evaluation);
        }

        let cells = (self.cells_at)(threshold)?;
        let evaluation = ThresholdEvaluation {
            threshold,
            cells,
            coverage: cells as f64 / self.data_cells as f64,
        };

        log::debug!(
            "Threshold {threshold}: {cells} cells, coverage {:.4}%",
            evaluation.coverage * 100.0
        );

        self.evaluations.push(evaluation);
        Ok(evaluation)
    }
}

#[derive(Debug, Clone, Copy)]
struct BracketEnd {
    threshold: i64,
    coverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

/// Secant step between the bracket ends, clamped inside the bracket.
/// Bisects when requested or when the coverage difference of the bracket ends is zero.
fn next_threshold(lower: BracketEnd, upper: BracketEnd, target: f64, bisect: bool) -> i64 {
    let span = upper.threshold - lower.threshold;
    let midpoint = lower.threshold + span / 2;
    let coverage_span = lower.coverage - upper.coverage;

    let threshold = if bisect || coverage_span <= 0.0 {
        midpoint
    } else {
        let fraction = (lower.coverage - target) / coverage_span;
        lower.threshold + (fraction * span as f64).round() as i64
    };

    threshold.clamp(lower.threshold + 1, upper.threshold - 1)
}

/// Returns true when a threshold was accepted within the tolerance
fn bracketing_search<F>(
    evaluator: &mut CoverageEvaluator<F>,
    range: &RangeInclusive<i64>,
    initial_threshold: i64,
    target: f64,
    config: &SearchConfig,
) -> Result<bool>
where
    F: FnMut(i64) -> Result<usize>,
{
    // everything is covered at the minimum value, nothing above the maximum
    let mut lower = BracketEnd {
        threshold: *range.start(),
        coverage: 1.0,
    };
    let mut upper = BracketEnd {
        threshold: *range.end() + 1,
        coverage: 0.0,
    };

    let mut threshold = initial_threshold.clamp(*range.start(), *range.end());
    let mut last_side = None;
    let mut same_side_steps = 0;

    loop {
        let evaluation = evaluator.evaluate(threshold)?;
        if within_tolerance(evaluation.coverage, target, config.tolerance) && config.selection.favors(evaluation.coverage, target) {
            return Ok(true);
        }

        let side = if reaches_target(evaluation.coverage, target) {
            if threshold > lower.threshold {
                lower = BracketEnd {
                    threshold,
                    coverage: evaluation.coverage,
                };
            }
            Side::Lower
        } else {
            if threshold < upper.threshold {
                upper = BracketEnd {
                    threshold,
                    coverage: evaluation.coverage,
                };
            }
            Side::Upper
        };

        same_side_steps = if last_side == Some(side) { same_side_steps + 1 } else { 1 };
        last_side = Some(side);

        if upper.threshold - lower.threshold <= 1 || evaluator.count() >= config.max_iterations {
            break;
        }

        threshold = next_threshold(lower, upper, target, same_side_steps >= 2);
    }

    // the crossing is resolved, make sure the bracket ends that can be selected are known
    let mut ends = vec![lower.threshold];
    if config.selection == SelectionPolicy::Closest {
        ends.push(upper.threshold);
    }

    for end in ends {
        if evaluator.count() < config.max_iterations && evaluator.evaluated(end).is_none() {
            evaluator.evaluate(end)?;
        }
    }

    Ok(false)
}

/// Evaluates the initial threshold and its neighbours, alternating above and below
fn neighborhood_scan<F>(
    evaluator: &mut CoverageEvaluator<F>,
    range: &RangeInclusive<i64>,
    initial_threshold: i64,
    radius: u32,
    max_iterations: usize,
) -> Result
where
    F: FnMut(i64) -> Result<usize>,
{
    let radius = i64::from(radius);
    let candidates = std::iter::once(initial_threshold)
        .chain((1..=radius).flat_map(|step| [initial_threshold + step, initial_threshold - step]));

    for threshold in candidates {
        if evaluator.count() >= max_iterations {
            break;
        }

        evaluator.evaluate(threshold.clamp(*range.start(), *range.end() + 1))?;
    }

    Ok(())
}

/// Searches the threshold whose coverage is closest to the target according to the selection policy.
///
/// * `range` - the smallest and largest (integer) value of the data
/// * `initial_threshold` - the first threshold to evaluate
/// * `data_cells` - the number of cells the coverage is relative to
/// * `cells_at` - the number of covered cells of a threshold
pub fn search_threshold<F>(
    range: RangeInclusive<i64>,
    initial_threshold: i64,
    target: f64,
    data_cells: usize,
    config: &SearchConfig,
    cells_at: F,
) -> Result<ThresholdSearch>
where
    F: FnMut(i64) -> Result<usize>,
{
    validate_coverage(target)?;
    config.validate()?;
    if data_cells == 0 || range.is_empty() {
        return Err(Error::InvalidArgument("The threshold search requires data".into()));
    }

    let mut evaluator = CoverageEvaluator {
        data_cells,
        cells_at,
        evaluations: Vec::new(),
    };

    match config.strategy {
        SearchStrategy::Bracketing => {
            bracketing_search(&mut evaluator, &range, initial_threshold, target, config)?;
        }
        SearchStrategy::NeighborhoodScan { radius } => {
            neighborhood_scan(&mut evaluator, &range, initial_threshold, radius, config.max_iterations)?;
        }
    }

    let selected = *config
        .selection
        .select(&evaluator.evaluations, target)
        .ok_or_else(|| Error::InvalidArgument("No threshold was evaluated".into()))?;

    let converged = within_tolerance(selected.coverage, target, config.tolerance);
    if !converged {
        log::warn!(
            "Threshold search did not converge: best threshold {} covers {:.4}% instead of {:.4}% (tolerance {:.4}%) after {} evaluations",
            selected.threshold,
            selected.coverage * 100.0,
            target * 100.0,
            config.tolerance * 100.0,
            evaluator.count()
        );
    }

    Ok(ThresholdSearch {
        threshold: selected.threshold,
        coverage: selected.coverage,
        target,
        initial_threshold,
        iterations: evaluator.count(),
        converged,
        evaluations: evaluator.evaluations,
    })
}

/// The first threshold guess: the `(1 - target)` quantile of the data values, rounded down
pub fn initial_threshold<R: Array>(richness: &R, target: f64, interpolation: QuantileInterpolation) -> Result<i64> {
    validate_coverage(target)?;
    let quantile = algo::quantiles_with_interpolation(richness, &[1.0 - target], interpolation)?
        .and_then(|q| q.first().copied())
        .ok_or_else(|| Error::InvalidArgument("The richness raster contains no data".into()))?;

    Ok(quantile.floor() as i64)
}

fn value_range<R: Array>(richness: &R) -> Result<RangeInclusive<i64>> {
    let range = algo::min_max(richness).ok_or_else(|| Error::InvalidArgument("The richness raster contains no data".into()))?;
    let min = range.start().to_f64().unwrap_or(0.0).floor() as i64;
    let max = range.end().to_f64().unwrap_or(0.0).floor() as i64;
    Ok(min..=max)
}

/// Searches the threshold of the richness raster for the target coverage.
/// The contiguity filter is required when the coverage is based on the filtered hotspots.
pub fn find_threshold<R: Array>(
    richness: &R,
    target: f64,
    config: &SearchConfig,
    filter: Option<&ContiguityFilter>,
) -> Result<ThresholdSearch> {
    let range = value_range(richness)?;
    let initial = initial_threshold(richness, target, config.quantile_interpolation)?;
    let data_cells = richness.data_count();

    log::debug!(
        "Searching threshold for {:.4}% coverage: values {}..={}, initial threshold {initial}",
        target * 100.0,
        range.start(),
        range.end()
    );

    match config.coverage_basis {
        CoverageBasis::Candidate => search_threshold(range, initial, target, data_cells, config, |threshold| {
            Ok(algo::count_at_or_above(richness, threshold as f64))
        }),
        CoverageBasis::Filtered => {
            let filter = filter.ok_or_else(|| Error::InvalidArgument("A filtered coverage requires a contiguity filter".into()))?;
            search_threshold(range, initial, target, data_cells, config, |threshold| {
                let mut mask = algo::threshold_mask(richness, threshold as f64)?;
                Ok(filter.apply(&mut mask)?.kept_cells)
            })
        }
    }
}
