//! # track_eval
//!
//! Evaluation and dataset assembly for tracking-estimator runs.
//!
//! Data flow:
//!
//! ```text
//! ScenarioCatalog → RunDriver → load_run → RunMetrics → MetricsReport / PlotWriter
//!                                        ↘ Dataset → partition → train/val/test CSV
//! ```
//!
//! The estimator is reached through the [`Estimator`] trait: either the
//! external `let_track` process or the in-process reference run from `sim`.
//! Everything runs sequentially and every error is fatal.

pub mod catalog;
pub mod check;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod plot;
pub mod report;
pub mod settings;
pub mod split;

pub use catalog::{RunParams, ScenarioCatalog};
pub use check::{check_dataset, DatasetCheck};
pub use dataset::{Dataset, DatasetRow};
pub use driver::{Estimator, InProcessEstimator, ProcessEstimator, RunArtifact, RunDriver};
pub use error::{EvalError, Result};
pub use loader::{load_run, MergedRecord, MergedRun};
pub use metrics::{compare, consistency_stats, position_velocity_rmse, rmse, Improvement, RunMetrics};
pub use pipeline::{evaluate, make_dataset, DatasetOutcome, EvalOutcome};
pub use plot::PlotWriter;
pub use report::{MetricsReport, ReportKind};
pub use settings::{load_or_default, DatasetSettings, EvalSettings};
pub use split::{partition, GroupKey, Split};
