//! Pipeline settings with defaults, optionally loaded from a JSON file.
//!
//! Every field has a default, so a settings file only needs the keys it
//! changes. Command-line flags are applied on top by the caller.

use crate::{
    catalog::{RunParams, ScenarioCatalog},
    error::{EvalError, Result},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sim::ScenarioKind;
use std::path::{Path, PathBuf};
use tracker_core::Mode;

/// Settings for `evaluate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    pub steps: u32,
    pub seed: u64,
    pub dt: f64,
    pub q: f64,
    pub r: f64,
    pub clutter_range: f64,
    /// Scenarios to run, in this order
    pub scenarios: Vec<ScenarioKind>,
    /// Base for the relative output directories below
    pub root: Option<PathBuf>,
    /// Where scenario runs are written
    pub out_root: PathBuf,
    pub reports_dir: PathBuf,
    pub plots_dir: PathBuf,
    /// Run baseline and a1 per scenario and report improvements
    pub compare: bool,
    /// Small deterministic evaluation (250 steps, seed 123)
    pub smoke: bool,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            steps: 800,
            seed: 123,
            dt: 0.02,
            q: 1.0,
            r: 4.0,
            clutter_range: 80.0,
            scenarios: ScenarioKind::ALL.to_vec(),
            root: None,
            out_root: PathBuf::from("out_eval"),
            reports_dir: PathBuf::from("reports"),
            plots_dir: PathBuf::from("plots"),
            compare: false,
            smoke: false,
        }
    }
}

impl EvalSettings {
    pub const SMOKE_STEPS: u32 = 250;
    pub const SMOKE_SEED: u64 = 123;

    /// Apply the smoke-test overrides when `smoke` is set, then place the
    /// output directories under `root`.
    pub fn resolved(mut self) -> Self {
        if self.smoke {
            self.steps = Self::SMOKE_STEPS;
            self.seed = Self::SMOKE_SEED;
            self.out_root = PathBuf::from("out_smoke_eval");
        }
        if let Some(root) = self.root.take() {
            for dir in [&mut self.out_root, &mut self.reports_dir, &mut self.plots_dir] {
                *dir = root.join(&*dir);
            }
        }
        self
    }

    pub fn run_params(&self) -> RunParams {
        RunParams {
            steps: self.steps,
            dt: self.dt,
            q: self.q,
            r: self.r,
            clutter_range: self.clutter_range,
        }
    }

    pub fn catalog(&self) -> ScenarioCatalog {
        ScenarioCatalog::from_kinds(&self.scenarios)
    }

    /// File name of the JSON report.
    pub fn report_name(&self) -> String {
        let kind = if self.compare { "comparison" } else { "baseline" };
        if self.smoke {
            format!("smoke_{kind}_metrics.json")
        } else {
            format!("{kind}_metrics.json")
        }
    }
}

/// Settings for `make_dataset`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    pub steps: u32,
    /// Number of seeds per scenario
    pub seeds: u32,
    pub base_seed: u64,
    pub dt: f64,
    pub q: f64,
    pub r: f64,
    pub clutter_range: f64,
    pub mode: Mode,
    pub scenarios: Vec<ScenarioKind>,
    /// Base for the relative output directories below
    pub root: Option<PathBuf>,
    /// Where split files are written
    pub out_data: PathBuf,
    /// Where individual runs are written
    pub runs_dir: PathBuf,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            steps: 600,
            seeds: 12,
            base_seed: 100,
            dt: 0.02,
            q: 1.0,
            r: 4.0,
            clutter_range: 80.0,
            mode: Mode::Baseline,
            scenarios: ScenarioKind::ALL.to_vec(),
            root: None,
            out_data: PathBuf::from("data"),
            runs_dir: PathBuf::from("data/runs"),
        }
    }
}

impl DatasetSettings {
    /// Place the output directories under `root`.
    pub fn resolved(mut self) -> Self {
        if let Some(root) = self.root.take() {
            self.out_data = root.join(&self.out_data);
            self.runs_dir = root.join(&self.runs_dir);
        }
        self
    }

    pub fn catalog(&self) -> ScenarioCatalog {
        ScenarioCatalog::from_kinds(&self.scenarios)
    }

    pub fn run_params(&self) -> RunParams {
        RunParams {
            steps: self.steps,
            dt: self.dt,
            q: self.q,
            r: self.r,
            clutter_range: self.clutter_range,
        }
    }
}

/// Load settings from `path`, or defaults when no path is given.
pub fn load_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    let value = serde_json::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "loaded settings");
    Ok(value)
}
