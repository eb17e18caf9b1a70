//! Metrics report: per-scenario, per-mode aggregates serialised as JSON.

use crate::error::{EvalError, Result};
use crate::metrics::{compare, Improvement, RunMetrics};
use serde::{Deserialize, Serialize};
use sim::ScenarioConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracker_core::Mode;

/// What kind of evaluation produced the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Baseline,
    Comparison,
}

/// Metrics of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModeResult {
    pub meta: ScenarioConfig,
    pub metrics: RunMetrics,
    pub artifact_dir: PathBuf,
    /// Hex stream digest, when the estimator reported one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub digest: Option<String>,
}

/// All runs of one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub modes: BTreeMap<Mode, ModeResult>,
    /// `a1` against `baseline`; only when both ran
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub improvement: Option<Improvement>,
}

impl ScenarioReport {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            modes: BTreeMap::new(),
            improvement: None,
        }
    }

    /// Record a mode's result and refresh the improvement figures.
    pub fn insert(&mut self, mode: Mode, result: ModeResult) {
        self.modes.insert(mode, result);
        self.improvement = match (self.modes.get(&Mode::Baseline), self.modes.get(&Mode::A1)) {
            (Some(base), Some(cand)) => Some(compare(&base.metrics, &cand.metrics)),
            _ => None,
        };
    }
}

/// Full evaluation report, in catalog order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub kind: ReportKind,
    pub smoke: bool,
    pub steps: u32,
    pub seed: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl MetricsReport {
    pub fn new(kind: ReportKind, smoke: bool, steps: u32, seed: u64) -> Self {
        Self {
            kind,
            smoke,
            steps,
            seed,
            scenarios: Vec::new(),
        }
    }

    /// Write pretty JSON to `dir/name`, creating `dir`.
    pub fn write(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;
        let path = dir.join(name);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| EvalError::io(&path, e))?;
        info!(path = %path.display(), scenarios = self.scenarios.len(), "wrote metrics report");
        Ok(path)
    }

    /// One line per scenario and mode, for the console.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for s in &self.scenarios {
            for (mode, result) in &s.modes {
                let m = &result.metrics;
                lines.push(format!(
                    "{:<11} {:<8} pos_rmse={:.3} vel_rmse={:.3} nis_mean={:.3} nis_p95={:.3}",
                    s.scenario,
                    mode,
                    m.errors.pos_rmse,
                    m.errors.vel_rmse,
                    m.consistency.nis_mean,
                    m.consistency.nis_p95,
                ));
            }
            if let Some(imp) = &s.improvement {
                lines.push(format!(
                    "{:<11} a1 vs baseline: pos {:+.1}% vel {:+.1}% nis-consistency {:+.1}%",
                    s.scenario, imp.pos_rmse_pct, imp.vel_rmse_pct, imp.nis_consistency_pct
                ));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{nis_consistency, TrackingErrors};

    fn result(mode: Mode, pos: f64, nis: f64) -> ModeResult {
        ModeResult {
            meta: ScenarioConfig::default().with_mode(mode),
            metrics: RunMetrics {
                errors: TrackingErrors {
                    pos_rmse: pos,
                    vel_rmse: 1.0,
                },
                consistency: nis_consistency(&[nis]),
            },
            artifact_dir: PathBuf::from(format!("out/{mode}/cv")),
            digest: None,
        }
    }

    #[test]
    fn improvement_appears_once_both_modes_ran() {
        let mut s = ScenarioReport::new("cv");
        s.insert(Mode::Baseline, result(Mode::Baseline, 2.0, 3.0));
        assert!(s.improvement.is_none());
        s.insert(Mode::A1, result(Mode::A1, 1.0, 2.5));
        let imp = s.improvement.unwrap();
        assert_eq!(imp.pos_rmse_pct, 50.0);
        assert_eq!(imp.vel_rmse_pct, 0.0);
        assert_eq!(imp.nis_consistency_pct, 50.0);
    }

    #[test]
    fn report_json_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = MetricsReport::new(ReportKind::Comparison, false, 800, 123);
        let mut s = ScenarioReport::new("cv");
        s.insert(Mode::Baseline, result(Mode::Baseline, 2.0, 2.0));
        s.insert(Mode::A1, result(Mode::A1, 2.0, 2.0));
        report.scenarios.push(s);

        let path = report.write(&dir.path().join("reports"), "comparison_metrics.json").unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(v["kind"], "comparison");
        let cv = &v["scenarios"][0];
        assert_eq!(cv["scenario"], "cv");
        assert_eq!(cv["modes"]["baseline"]["meta"]["scenario"], "cv");
        assert_eq!(cv["modes"]["a1"]["metrics"]["pos_rmse"], 2.0);
        assert_eq!(cv["improvement"]["pos_rmse_pct"], 0.0);
        assert_eq!(report.summary_lines().len(), 3);
    }
}
