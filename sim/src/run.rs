//! Reference estimator run: simulate truth and measurements, filter them,
//! and write the run artifact.
//!
//! This is the body of the `let_track` process. Identical configs produce
//! byte-identical artifacts.

use crate::{
    artifact::{stream_digest, ArtifactWriter, DiagRow, MeasRow, StateRow},
    config::ScenarioConfig,
    scenarios::SimParams,
    sensor::PositionSensor,
    target::{Target, TruthState},
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracker_core::{AdaptiveRTuner, CvKalmanFilter, CvKfConfig, MeasVec, TunerConfig};

/// Knobs of the reference estimator that are not part of the run identity.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub tuner: TunerConfig,
    /// Compute the stream digest after writing
    pub hash: bool,
}

/// Outcome of one reference run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub out_dir: PathBuf,
    pub steps: u32,
    pub detections: u32,
    pub digest: Option<u64>,
}

/// Run the reference estimator for `config`, writing the artifact to `out_dir`.
pub fn execute(config: &ScenarioConfig, options: &RunOptions, out_dir: &Path) -> Result<RunSummary> {
    config.validate()?;
    let params = SimParams::resolve(config);

    let maneuver_at = params.maneuver.then_some(params.steps / 2);
    let mut target = Target::new(TruthState::default(), maneuver_at);
    let mut sensor = PositionSensor::new(
        params.sigma_z,
        params.p_detect,
        params.clutter_prob,
        params.clutter_range,
        config.seed,
    );
    let mut kf = CvKalmanFilter::new(
        params.dt,
        CvKfConfig {
            q: config.process_noise_q,
            r: config.measurement_noise_r,
            ..Default::default()
        },
    );
    let mut tuner = AdaptiveRTuner::new(options.tuner.clone());

    let mut writer = ArtifactWriter::create(out_dir, config)?;
    let mut detections = 0u32;

    for k in 0..params.steps {
        let truth = target.step(k, params.dt);
        let obs = sensor.observe(&truth);

        let z = obs.valid.then(|| MeasVec::new(obs.zx, obs.zy));
        let tracking = kf.is_initialized();
        let innov = kf.step(z);

        if obs.valid {
            detections += 1;
            // The first fix only initialises the track; there is no innovation to tune on.
            if config.mode.is_adaptive() && tracking {
                let r = tuner.step(innov.nis, kf.r());
                kf.set_r(r);
            }
        }

        let est = kf.state();
        writer.write_step(
            &StateRow {
                k,
                x: truth.x,
                y: truth.y,
                vx: truth.vx,
                vy: truth.vy,
            },
            &MeasRow {
                k,
                zx: obs.zx,
                zy: obs.zy,
                valid: obs.valid,
            },
            &StateRow {
                k,
                x: est[0],
                y: est[1],
                vx: est[2],
                vy: est[3],
            },
            &DiagRow {
                k,
                yx: innov.yx,
                yy: innov.yy,
                sx: innov.sx,
                sy: innov.sy,
                nis: innov.nis,
                q: kf.config.q,
                r: kf.r(),
                nis_ema: tuner.nis_ema(),
            },
        )?;
    }

    let out_dir = writer.finish()?;
    let digest = if options.hash {
        Some(stream_digest(&out_dir)?)
    } else {
        None
    };

    tracing::debug!(
        scenario = %config.name,
        seed = config.seed,
        mode = %config.mode,
        steps = params.steps,
        detections,
        "reference run complete"
    );

    Ok(RunSummary {
        out_dir,
        steps: params.steps,
        detections,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{DIAG_FILE, MEAS_FILE, STREAM_FILES, TRUTH_FILE};
    use tracker_core::Mode;

    fn small(name: &str, mode: Mode) -> ScenarioConfig {
        ScenarioConfig {
            name: name.into(),
            mode,
            steps: 40,
            seed: 9,
            ..Default::default()
        }
    }

    #[test]
    fn identical_configs_give_identical_bytes() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            hash: true,
            ..Default::default()
        };
        let cfg = small("clutter", Mode::A1);

        let ra = execute(&cfg, &opts, a.path()).unwrap();
        let rb = execute(&cfg, &opts, b.path()).unwrap();
        assert_eq!(ra.digest, rb.digest);
        for name in STREAM_FILES {
            let fa = std::fs::read(a.path().join(name)).unwrap();
            let fb = std::fs::read(b.path().join(name)).unwrap();
            assert_eq!(fa, fb, "{name} differs");
        }
    }

    #[test]
    fn writes_one_row_per_step() {
        let dir = tempfile::tempdir().unwrap();
        let summary = execute(&small("cv", Mode::Baseline), &RunOptions::default(), dir.path()).unwrap();
        assert_eq!(summary.steps, 40);
        assert_eq!(summary.detections, 40);
        assert!(summary.digest.is_none());
        for name in [TRUTH_FILE, MEAS_FILE, DIAG_FILE] {
            let text = std::fs::read_to_string(dir.path().join(name)).unwrap();
            assert_eq!(text.lines().count(), 41, "{name}");
        }
    }

    #[test]
    fn baseline_keeps_r_fixed() {
        let dir = tempfile::tempdir().unwrap();
        execute(&small("high_noise", Mode::Baseline), &RunOptions::default(), dir.path()).unwrap();
        let mut rdr = csv::Reader::from_path(dir.path().join(DIAG_FILE)).unwrap();
        for row in rdr.deserialize::<DiagRow>() {
            let row = row.unwrap();
            assert_eq!(row.r, 4.0);
            assert_eq!(row.nis_ema, None);
        }
    }

    #[test]
    fn adaptive_tuning_starts_after_the_first_fix() {
        let dir = tempfile::tempdir().unwrap();
        execute(&small("cv", Mode::A1), &RunOptions::default(), dir.path()).unwrap();
        let mut rdr = csv::Reader::from_path(dir.path().join(DIAG_FILE)).unwrap();
        let rows: Vec<DiagRow> = rdr.deserialize().map(|r| r.unwrap()).collect();

        assert_eq!(rows[0].nis, 0.0);
        assert_eq!(rows[0].nis_ema, None);
        assert_eq!(rows[0].r, 4.0);
        // The EMA is seeded by the first real innovation.
        assert_eq!(rows[1].nis_ema, Some(rows[1].nis));
        assert!(rows[1].nis > 0.0);
    }

    #[test]
    fn invalid_config_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let cfg = ScenarioConfig {
            steps: 0,
            ..Default::default()
        };
        assert!(execute(&cfg, &RunOptions::default(), &out).is_err());
        assert!(!out.exists());
    }
}
