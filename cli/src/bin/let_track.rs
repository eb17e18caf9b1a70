//! `let_track`: reference estimator process.
//!
//! Simulates one scenario, filters it in `baseline` or `a1` mode and writes
//! the run artifact (truth/meas/est/diag/meta CSVs) into `--out`.

use anyhow::{Context, Result};
use clap::Parser;
use sim::{execute, RunOptions, ScenarioConfig};
use std::path::PathBuf;
use tracker_core::{Mode, TunerConfig};

#[derive(Parser)]
#[command(name = "let_track", about = "Reference single-target tracking run")]
struct Args {
    #[arg(long, default_value = "baseline", value_parser = parse_mode)]
    mode: Mode,
    #[arg(long, default_value = "cv")]
    scenario: String,
    #[arg(long, default_value_t = 123)]
    seed: u64,
    #[arg(long, default_value_t = 500)]
    steps: u32,
    #[arg(long, default_value_t = 0.02)]
    dt: f64,
    #[arg(long = "sigma_z", default_value_t = 2.0)]
    sigma_z: f64,
    #[arg(long = "p_detect", default_value_t = 1.0)]
    p_detect: f64,
    #[arg(long = "clutter_prob", default_value_t = 0.0)]
    clutter_prob: f64,
    #[arg(long = "clutter_range", default_value_t = 80.0)]
    clutter_range: f64,
    /// Filter process noise spectral density
    #[arg(long, default_value_t = 1.0)]
    q: f64,
    /// Filter measurement noise variance
    #[arg(long, default_value_t = 4.0)]
    r: f64,
    #[arg(long, default_value = "out")]
    out: PathBuf,
    /// Print the XOR of the FNV-1a hashes of every stream data line
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    hash: u8,

    #[arg(long = "a1_target_nis")]
    a1_target_nis: Option<f64>,
    #[arg(long = "a1_ema")]
    a1_ema: Option<f64>,
    #[arg(long = "a1_gain")]
    a1_gain: Option<f64>,
    #[arg(long = "a1_deadband")]
    a1_deadband: Option<f64>,
    #[arg(long = "a1_rmin")]
    a1_rmin: Option<f64>,
    #[arg(long = "a1_rmax")]
    a1_rmax: Option<f64>,
    #[arg(long = "a1_spike_nis")]
    a1_spike_nis: Option<f64>,
    #[arg(long = "a1_spike_gain")]
    a1_spike_gain: Option<f64>,
    #[arg(long = "a1_spike_cap_ratio")]
    a1_spike_cap_ratio: Option<f64>,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    s.parse()
}

impl Args {
    fn config(&self) -> ScenarioConfig {
        ScenarioConfig {
            mode: self.mode,
            name: self.scenario.clone(),
            dt: self.dt,
            seed: self.seed,
            steps: self.steps,
            sigma_z: self.sigma_z,
            p_detect: self.p_detect,
            clutter_prob: self.clutter_prob,
            clutter_range: self.clutter_range,
            process_noise_q: self.q,
            measurement_noise_r: self.r,
        }
    }

    fn tuner(&self) -> TunerConfig {
        let d = TunerConfig::default();
        TunerConfig {
            target_nis: self.a1_target_nis.unwrap_or(d.target_nis),
            nis_ema_alpha: self.a1_ema.unwrap_or(d.nis_ema_alpha),
            gain: self.a1_gain.unwrap_or(d.gain),
            deadband: self.a1_deadband.unwrap_or(d.deadband),
            r_min: self.a1_rmin.unwrap_or(d.r_min),
            r_max: self.a1_rmax.unwrap_or(d.r_max),
            spike_nis: self.a1_spike_nis.unwrap_or(d.spike_nis),
            spike_gain: self.a1_spike_gain.unwrap_or(d.spike_gain),
            spike_cap_ratio: self.a1_spike_cap_ratio.unwrap_or(d.spike_cap_ratio),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();
    let options = RunOptions {
        tuner: args.tuner(),
        hash: args.hash == 1,
    };

    let summary = execute(&config, &options, &args.out)
        .with_context(|| format!("run '{}' (seed {}) failed", config.name, config.seed))?;

    if let Some(digest) = summary.digest {
        println!("FNV1A64_XOR={digest:016x}");
    }
    println!("Wrote outputs to: {}", summary.out_dir.display());
    Ok(())
}
