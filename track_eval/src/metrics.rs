//! Accuracy and filter-consistency metrics over joined run records.
//!
//! All functions are pure. Empty inputs yield NaN statistics rather than an
//! error or a misleading zero.

use crate::loader::MergedRecord;
use serde::{Deserialize, Serialize};
use tracker_core::MEAS_DIM;

/// Expected mean NIS for a consistent filter: the measurement dimension.
pub const NIS_TARGET: f64 = MEAS_DIM as f64;

/// Floor on the baseline value in [`compare`].
pub const IMPROVEMENT_EPS: f64 = 1e-9;

/// Root-mean-square of `errors`; NaN when empty.
pub fn rmse(errors: &[f64]) -> f64 {
    if errors.is_empty() {
        return f64::NAN;
    }
    (errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64).sqrt()
}

/// Position and velocity RMSE of a run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingErrors {
    pub pos_rmse: f64,
    pub vel_rmse: f64,
}

/// Euclidean position error at every step.
pub fn per_step_position_errors(records: &[MergedRecord]) -> Vec<f64> {
    records.iter().map(MergedRecord::position_error).collect()
}

/// RMSE of the per-step Euclidean position and velocity errors.
pub fn position_velocity_rmse(records: &[MergedRecord]) -> TrackingErrors {
    let vel: Vec<f64> = records.iter().map(MergedRecord::velocity_error).collect();
    TrackingErrors {
        pos_rmse: rmse(&per_step_position_errors(records)),
        vel_rmse: rmse(&vel),
    }
}

/// NIS distribution summary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyStats {
    pub nis_mean: f64,
    pub nis_p50: f64,
    pub nis_p95: f64,
    /// `nis_mean − 2`: positive means noise is underestimated (overconfident
    /// filter), negative means overestimated
    #[serde(rename = "nis_mean_error_vs_2")]
    pub nis_mean_error: f64,
    /// Number of steps that contributed
    pub samples: usize,
}

/// NIS values of the steps that processed a valid measurement.
///
/// The first valid measurement initialises the track and has no innovation,
/// so it is not a sample.
pub fn nis_samples(records: &[MergedRecord]) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.has_valid_measurement())
        .skip(1)
        .map(|r| r.diagnostics.nis)
        .collect()
}

/// Consistency of the filter's noise model, from NIS of valid-measurement steps.
pub fn consistency_stats(records: &[MergedRecord]) -> ConsistencyStats {
    nis_consistency(&nis_samples(records))
}

/// [`consistency_stats`] over raw NIS values.
pub fn nis_consistency(nis: &[f64]) -> ConsistencyStats {
    let mean = if nis.is_empty() {
        f64::NAN
    } else {
        nis.iter().sum::<f64>() / nis.len() as f64
    };
    let mut sorted = nis.to_vec();
    sorted.sort_by(f64::total_cmp);
    ConsistencyStats {
        nis_mean: mean,
        nis_p50: percentile(&sorted, 50.0),
        nis_p95: percentile(&sorted, 95.0),
        nis_mean_error: mean - NIS_TARGET,
        samples: nis.len(),
    }
}

/// Percentile `p` (0–100) of ascending `sorted`, linearly interpolated
/// between closest ranks; NaN when empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Everything reported for one run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    #[serde(flatten)]
    pub errors: TrackingErrors,
    #[serde(flatten)]
    pub consistency: ConsistencyStats,
}

impl RunMetrics {
    pub fn compute(records: &[MergedRecord]) -> Self {
        Self {
            errors: position_velocity_rmse(records),
            consistency: consistency_stats(records),
        }
    }

    /// Distance of mean NIS from its target; lower is better.
    pub fn consistency_error(&self) -> f64 {
        self.consistency.nis_mean_error.abs()
    }
}

/// Percentage improvement of a candidate over a baseline; positive means the
/// candidate is better.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub pos_rmse_pct: f64,
    pub vel_rmse_pct: f64,
    pub nis_consistency_pct: f64,
}

/// `(baseline − candidate) / max(ε, baseline) × 100` for a lower-is-better metric.
///
/// Identical values give exactly 0, including two NaN sentinels from empty
/// inputs.
pub fn improvement_pct(baseline: f64, candidate: f64) -> f64 {
    if baseline == candidate || baseline.total_cmp(&candidate).is_eq() {
        return 0.0;
    }
    (baseline - candidate) / baseline.max(IMPROVEMENT_EPS) * 100.0
}

/// Compare a candidate mode's metrics against the baseline's.
pub fn compare(baseline: &RunMetrics, candidate: &RunMetrics) -> Improvement {
    Improvement {
        pos_rmse_pct: improvement_pct(baseline.errors.pos_rmse, candidate.errors.pos_rmse),
        vel_rmse_pct: improvement_pct(baseline.errors.vel_rmse, candidate.errors.vel_rmse),
        nis_consistency_pct: improvement_pct(
            baseline.consistency_error(),
            candidate.consistency_error(),
        ),
    }
}
