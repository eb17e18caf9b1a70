//! End-to-end entry points: evaluation (baseline or comparison) and dataset
//! generation. Runs execute strictly in catalog order; the first failure
//! aborts.

use crate::{
    catalog::scenario_config,
    dataset::Dataset,
    driver::{Estimator, RunDriver},
    error::Result,
    loader::load_run,
    metrics::{nis_samples, per_step_position_errors, RunMetrics},
    plot::PlotWriter,
    report::{MetricsReport, ModeResult, ReportKind, ScenarioReport},
    settings::{DatasetSettings, EvalSettings},
    split::{partition, Split},
};
use sim::ScenarioConfig;
use std::path::{Path, PathBuf};
use tracing::info;
use tracker_core::Mode;

/// Everything an evaluation produced.
#[derive(Debug)]
pub struct EvalOutcome {
    pub report: MetricsReport,
    pub report_path: PathBuf,
    pub plots: Vec<PathBuf>,
}

/// Directory of an evaluation run.
pub fn eval_run_dir(out_root: &Path, config: &ScenarioConfig, per_mode: bool) -> PathBuf {
    if per_mode {
        out_root.join(config.mode.as_str()).join(&config.name)
    } else {
        out_root.join(&config.name)
    }
}

/// Directory of a dataset run.
pub fn dataset_run_dir(runs_dir: &Path, config: &ScenarioConfig) -> PathBuf {
    runs_dir.join(format!("{}_seed{}", config.name, config.seed))
}

/// Run every catalog scenario (in both modes when comparing), compute
/// metrics, and write the JSON report and charts.
pub fn evaluate<E: Estimator>(settings: EvalSettings, estimator: E) -> Result<EvalOutcome> {
    let settings = settings.resolved();
    let catalog = settings.catalog();
    let driver = RunDriver::new(estimator);
    let params = settings.run_params();
    let modes: &[Mode] = if settings.compare {
        &Mode::ALL
    } else {
        &[Mode::Baseline]
    };
    let kind = if settings.compare {
        ReportKind::Comparison
    } else {
        ReportKind::Baseline
    };
    let plots = PlotWriter::new(&settings.plots_dir).with_prefix(if settings.smoke {
        "smoke_"
    } else {
        ""
    });

    info!(
        kind = ?kind,
        scenarios = catalog.len(),
        steps = settings.steps,
        seed = settings.seed,
        "starting evaluation"
    );

    let mut report = MetricsReport::new(kind, settings.smoke, settings.steps, settings.seed);
    let mut plot_paths = Vec::new();
    let mut rmse_groups = Vec::new();

    for preset in catalog.entries() {
        let name = preset.kind.name();
        let mut scenario = ScenarioReport::new(name);
        let mut error_series = Vec::new();
        let mut rmse = Vec::new();

        for &mode in modes {
            let config = scenario_config(preset, settings.seed, mode, &params);
            let dir = eval_run_dir(&settings.out_root, &config, settings.compare);
            let artifact = driver.run(&config, &dir)?;
            let run = load_run(&artifact.dir)?;
            let metrics = RunMetrics::compute(&run.records);

            plot_paths.push(plots.nis_histogram(name, mode, &nis_samples(&run.records))?);
            if mode.is_adaptive() {
                let r: Vec<f64> = run.records.iter().map(|rec| rec.diagnostics.r).collect();
                plot_paths.push(plots.r_trajectory(name, &r, run.meta.sigma_z.powi(2))?);
            }
            error_series.push((mode, per_step_position_errors(&run.records)));
            rmse.push((mode, metrics.errors));

            scenario.insert(
                mode,
                ModeResult {
                    meta: run.meta,
                    metrics,
                    artifact_dir: artifact.dir,
                    digest: artifact.digest.map(|d| format!("{d:016x}")),
                },
            );
        }

        plot_paths.push(plots.position_error(name, &error_series)?);
        rmse_groups.push((name.to_string(), rmse));
        report.scenarios.push(scenario);
    }
    plot_paths.push(plots.rmse_bars(&rmse_groups)?);

    let report_path = report.write(&settings.reports_dir, &settings.report_name())?;
    for line in report.summary_lines() {
        info!("{line}");
    }
    Ok(EvalOutcome {
        report,
        report_path,
        plots: plot_paths,
    })
}

/// Everything dataset generation produced.
#[derive(Debug)]
pub struct DatasetOutcome {
    pub split: Split,
    /// Directory holding the split files
    pub out_data: PathBuf,
    pub runs: usize,
    pub rows: usize,
}

/// Run every `(scenario, seed)` pair, flatten the runs into one dataset,
/// split it by group, and write the split files.
pub fn make_dataset<E: Estimator>(settings: &DatasetSettings, estimator: E) -> Result<DatasetOutcome> {
    let settings = settings.clone().resolved();
    let catalog = settings.catalog();
    let driver = RunDriver::new(estimator);
    let configs = catalog.dataset_configs(
        settings.seeds,
        settings.base_seed,
        settings.mode,
        &settings.run_params(),
    );
    info!(
        runs = configs.len(),
        steps = settings.steps,
        mode = %settings.mode,
        "generating dataset"
    );

    let mut dataset = Dataset::new();
    for config in &configs {
        let artifact = driver.run(config, &dataset_run_dir(&settings.runs_dir, config))?;
        dataset.extend_run(&load_run(&artifact.dir)?);
    }

    let split = partition(&dataset)?;
    split.write(&settings.out_data)?;
    Ok(DatasetOutcome {
        runs: configs.len(),
        rows: dataset.len(),
        split,
        out_data: settings.out_data,
    })
}
