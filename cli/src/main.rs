//! `trackeval` CLI: scenario evaluation, mode comparison, dataset generation.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use track_eval::{
    check_dataset, evaluate, load_or_default, make_dataset, DatasetSettings, Estimator,
    EvalSettings, InProcessEstimator, ProcessEstimator,
};
use sim::ScenarioKind;
use tracker_core::Mode;

#[derive(Parser)]
#[command(name = "trackeval", about = "Tracking-estimator evaluation and dataset assembly")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// How to reach the estimator.
#[derive(Args)]
struct EstimatorArgs {
    /// Repository root: searched for build/, target/release/ or
    /// target/debug/let_track, and the base of relative output directories
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Explicit estimator binary (skips discovery)
    #[arg(long)]
    estimator: Option<PathBuf>,
    /// Run the reference estimator in this process instead of launching it
    #[arg(long)]
    in_process: bool,
    /// JSON settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every scenario and write metrics report and charts.
    Eval {
        #[command(flatten)]
        estimator: EstimatorArgs,
        #[arg(long)]
        out_root: Option<PathBuf>,
        #[arg(long)]
        reports_dir: Option<PathBuf>,
        #[arg(long)]
        plots_dir: Option<PathBuf>,
        #[arg(long)]
        steps: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        q: Option<f64>,
        #[arg(long)]
        r: Option<f64>,
        /// Restrict to these scenarios (comma separated)
        #[arg(long, value_enum, value_delimiter = ',')]
        scenarios: Option<Vec<ScenarioKind>>,
        /// Small deterministic run: 250 steps, seed 123, out_smoke_eval/
        #[arg(long)]
        smoke: bool,
        /// Run baseline and a1 per scenario and report improvements
        #[arg(long)]
        compare: bool,
    },
    /// Generate many seeded runs and split them into train/val/test CSVs.
    MakeDataset {
        #[command(flatten)]
        estimator: EstimatorArgs,
        #[arg(long)]
        out_data: Option<PathBuf>,
        #[arg(long)]
        runs_dir: Option<PathBuf>,
        #[arg(long)]
        steps: Option<u32>,
        /// Runs per scenario
        #[arg(long)]
        seeds: Option<u32>,
        #[arg(long)]
        base_seed: Option<u64>,
        #[arg(long)]
        q: Option<f64>,
        #[arg(long)]
        r: Option<f64>,
        #[arg(long, value_parser = parse_mode)]
        mode: Option<Mode>,
        /// Restrict to these scenarios (comma separated)
        #[arg(long, value_enum, value_delimiter = ',')]
        scenarios: Option<Vec<ScenarioKind>>,
    },
    /// Check that a dataset directory holds readable train/val/test splits.
    CheckDataset {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            estimator,
            out_root,
            reports_dir,
            plots_dir,
            steps,
            seed,
            q,
            r,
            scenarios,
            smoke,
            compare,
        } => {
            let mut s: EvalSettings = load_or_default(estimator.config.as_deref())?;
            apply(&mut s.out_root, out_root);
            apply(&mut s.reports_dir, reports_dir);
            apply(&mut s.plots_dir, plots_dir);
            apply(&mut s.steps, steps);
            apply(&mut s.seed, seed);
            apply(&mut s.q, q);
            apply(&mut s.r, r);
            apply(&mut s.scenarios, scenarios);
            s.root = Some(estimator.root.clone());
            s.smoke |= smoke;
            s.compare |= compare;
            tracing::debug!(settings = %serde_json::to_string(&s)?, "evaluation settings");

            if estimator.in_process {
                run_eval(s, InProcessEstimator::default())
            } else {
                run_eval(s, process_estimator(&estimator)?)
            }
        }
        Commands::MakeDataset {
            estimator,
            out_data,
            runs_dir,
            steps,
            seeds,
            base_seed,
            q,
            r,
            mode,
            scenarios,
        } => {
            let mut s: DatasetSettings = load_or_default(estimator.config.as_deref())?;
            apply(&mut s.out_data, out_data);
            apply(&mut s.runs_dir, runs_dir);
            apply(&mut s.steps, steps);
            apply(&mut s.seeds, seeds);
            apply(&mut s.base_seed, base_seed);
            apply(&mut s.q, q);
            apply(&mut s.r, r);
            apply(&mut s.mode, mode);
            apply(&mut s.scenarios, scenarios);
            s.root = Some(estimator.root.clone());
            tracing::debug!(settings = %serde_json::to_string(&s)?, "dataset settings");

            if estimator.in_process {
                run_dataset(&s, InProcessEstimator::default())
            } else {
                run_dataset(&s, process_estimator(&estimator)?)
            }
        }
        Commands::CheckDataset { data_dir } => {
            let check = check_dataset(&data_dir)
                .with_context(|| format!("checking dataset in {}", data_dir.display()))?;
            println!("{check}");
            Ok(())
        }
    }
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn process_estimator(args: &EstimatorArgs) -> Result<ProcessEstimator> {
    let est = match &args.estimator {
        Some(path) => ProcessEstimator::at(path)?,
        None => ProcessEstimator::discover(&args.root)?,
    };
    Ok(est)
}

fn run_eval<E: Estimator>(settings: EvalSettings, estimator: E) -> Result<()> {
    let start = std::time::Instant::now();
    let outcome = evaluate(settings, estimator).context("evaluation failed")?;

    for line in outcome.report.summary_lines() {
        println!("{line}");
    }
    println!(
        "Report: {} ({} charts, elapsed={:.2}s)",
        outcome.report_path.display(),
        outcome.plots.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_dataset<E: Estimator>(settings: &DatasetSettings, estimator: E) -> Result<()> {
    let start = std::time::Instant::now();
    let outcome = make_dataset(settings, estimator).context("dataset generation failed")?;

    println!(
        "Dataset: {} runs, {} rows, elapsed={:.2}s",
        outcome.runs,
        outcome.rows,
        start.elapsed().as_secs_f64()
    );
    print!("{}", outcome.split.summary());
    println!("Wrote splits to {}", outcome.out_data.display());
    Ok(())
}
