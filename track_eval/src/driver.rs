//! Run driver: executes the estimator once per configuration.
//!
//! The estimator sits behind [`Estimator`]. [`ProcessEstimator`] launches the
//! external `let_track` binary; [`InProcessEstimator`] calls the reference
//! implementation as a library. Either way a run either produces a complete
//! [`RunArtifact`] or fails the whole invocation.

use crate::error::{EvalError, Result};
use sim::{RunOptions, ScenarioConfig};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Name of the estimator binary.
pub const ESTIMATOR_BIN: &str = "let_track";

/// Stdout line prefix carrying the run digest.
const DIGEST_PREFIX: &str = "FNV1A64_XOR=";

/// Handle to a completed run's artifact directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunArtifact {
    pub dir: PathBuf,
    /// XOR of per-line FNV-1a hashes of the streams, when the estimator reported one
    pub digest: Option<u64>,
}

/// Something that can execute one run and leave its artifact in `out_dir`.
pub trait Estimator {
    fn run(&self, config: &ScenarioConfig, out_dir: &Path) -> Result<RunArtifact>;
}

// ---------------------------------------------------------------------------
// External process
// ---------------------------------------------------------------------------

/// Launches the estimator binary with the config as command-line flags.
#[derive(Clone, Debug)]
pub struct ProcessEstimator {
    pub executable: PathBuf,
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
    /// Ask the estimator to print its stream digest
    pub hash: bool,
}

impl ProcessEstimator {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            cwd: None,
            hash: true,
        }
    }

    /// Use an explicit binary path; it must exist.
    pub fn at(executable: impl Into<PathBuf>) -> Result<Self> {
        let executable = executable.into();
        if executable.is_file() {
            Ok(Self::new(executable))
        } else {
            Err(EvalError::ExecutableNotFound {
                searched: vec![executable],
            })
        }
    }

    /// Find the binary under `root` among the usual build locations.
    pub fn discover(root: &Path) -> Result<Self> {
        let candidates = candidate_paths(root);
        match candidates.iter().find(|p| p.is_file()) {
            Some(found) => {
                debug!(path = %found.display(), "found estimator executable");
                Ok(Self {
                    cwd: Some(root.to_path_buf()),
                    ..Self::new(found.clone())
                })
            }
            None => Err(EvalError::ExecutableNotFound {
                searched: candidates,
            }),
        }
    }

    /// Command-line arguments for one run.
    pub fn args(&self, config: &ScenarioConfig, out_dir: &Path) -> Vec<String> {
        vec![
            "--mode".into(),
            config.mode.to_string(),
            "--scenario".into(),
            config.name.clone(),
            "--seed".into(),
            config.seed.to_string(),
            "--steps".into(),
            config.steps.to_string(),
            "--dt".into(),
            config.dt.to_string(),
            "--sigma_z".into(),
            config.sigma_z.to_string(),
            "--p_detect".into(),
            config.p_detect.to_string(),
            "--clutter_prob".into(),
            config.clutter_prob.to_string(),
            "--clutter_range".into(),
            config.clutter_range.to_string(),
            "--q".into(),
            config.process_noise_q.to_string(),
            "--r".into(),
            config.measurement_noise_r.to_string(),
            "--out".into(),
            out_dir.display().to_string(),
            "--hash".into(),
            u8::from(self.hash).to_string(),
        ]
    }
}

fn candidate_paths(root: &Path) -> Vec<PathBuf> {
    let exe = format!("{ESTIMATOR_BIN}{}", std::env::consts::EXE_SUFFIX);
    ["build", "target/release", "target/debug"]
        .iter()
        .map(|dir| root.join(dir).join(&exe))
        .collect()
}

/// `path` made absolute against the current directory. The child may run
/// elsewhere, so it must never see a relative `--out`.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| EvalError::io(path, e))?;
    Ok(cwd.join(path))
}

impl Estimator for ProcessEstimator {
    fn run(&self, config: &ScenarioConfig, out_dir: &Path) -> Result<RunArtifact> {
        let args = self.args(config, &absolute(out_dir)?);
        let mut cmd = Command::new(&self.executable);
        cmd.args(&args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let command_line = format!("{} {}", self.executable.display(), args.join(" "));
        debug!(command = %command_line, "launching estimator");

        let output = cmd.output().map_err(|e| EvalError::io(&self.executable, e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvalError::RunFailure {
                command: command_line,
                status: output.status.to_string(),
                output: format!("{stdout}{stderr}"),
            });
        }

        Ok(RunArtifact {
            dir: out_dir.to_path_buf(),
            digest: parse_digest(&stdout),
        })
    }
}

/// Extract the `FNV1A64_XOR=<hex>` digest from estimator stdout.
pub fn parse_digest(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix(DIGEST_PREFIX))
        .and_then(|hex| u64::from_str_radix(hex.trim(), 16).ok())
}

// ---------------------------------------------------------------------------
// In-process reference estimator
// ---------------------------------------------------------------------------

/// Runs the reference estimator as a library call.
#[derive(Clone, Debug)]
pub struct InProcessEstimator {
    pub options: RunOptions,
}

impl Default for InProcessEstimator {
    fn default() -> Self {
        Self {
            options: RunOptions {
                hash: true,
                ..Default::default()
            },
        }
    }
}

impl Estimator for InProcessEstimator {
    fn run(&self, config: &ScenarioConfig, out_dir: &Path) -> Result<RunArtifact> {
        let summary = sim::execute(config, &self.options, out_dir).map_err(|e| {
            EvalError::RunFailure {
                command: format!("in-process {} run", config.name),
                status: "error".into(),
                output: format!("{e:#}"),
            }
        })?;
        Ok(RunArtifact {
            dir: summary.out_dir,
            digest: summary.digest,
        })
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Drives runs strictly one after another.
pub struct RunDriver<E> {
    estimator: E,
}

impl<E: Estimator> RunDriver<E> {
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    /// Validate `config`, create `out_dir`, and run the estimator into it.
    pub fn run(&self, config: &ScenarioConfig, out_dir: &Path) -> Result<RunArtifact> {
        config
            .validate()
            .map_err(|source| EvalError::InvalidConfig {
                scenario: config.name.clone(),
                source,
            })?;
        std::fs::create_dir_all(out_dir).map_err(|e| EvalError::io(out_dir, e))?;

        let artifact = self.estimator.run(config, out_dir)?;
        info!(
            scenario = %config.name,
            seed = config.seed,
            mode = %config.mode,
            dir = %artifact.dir.display(),
            digest = ?artifact.digest.map(|d| format!("{d:x}")),
            "run complete"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::Mode;

    #[test]
    fn args_cover_the_process_contract() {
        let est = ProcessEstimator::new("let_track");
        let cfg = ScenarioConfig {
            mode: Mode::A1,
            name: "clutter".into(),
            seed: 7,
            steps: 10,
            ..Default::default()
        };
        let args = est.args(&cfg, Path::new("out/clutter"));
        let value = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(value("--mode"), "a1");
        assert_eq!(value("--scenario"), "clutter");
        assert_eq!(value("--seed"), "7");
        assert_eq!(value("--steps"), "10");
        assert_eq!(value("--sigma_z"), "2");
        assert_eq!(value("--r"), "4");
        assert_eq!(value("--out"), "out/clutter");
        assert_eq!(value("--hash"), "1");
    }

    #[test]
    fn digest_is_parsed_from_stdout() {
        let out = "FNV1A64_XOR=1f2e3d\nWrote outputs to: x\n";
        assert_eq!(parse_digest(out), Some(0x1f2e3d));
        assert_eq!(parse_digest("Wrote outputs to: x\n"), None);
    }

    #[test]
    fn discover_reports_every_searched_path() {
        let dir = tempfile::tempdir().unwrap();
        match ProcessEstimator::discover(dir.path()) {
            Err(EvalError::ExecutableNotFound { searched }) => {
                assert_eq!(searched.len(), 3);
                assert!(searched[0].starts_with(dir.path().join("build")));
            }
            other => panic!("expected ExecutableNotFound, got {other:?}"),
        }
    }

    #[test]
    fn relative_out_dir_is_made_absolute() {
        let abs = absolute(Path::new("out_eval/cv")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("out_eval/cv"));
        assert_eq!(absolute(&abs).unwrap(), abs);
    }

    #[test]
    fn invalid_config_never_reaches_the_estimator() {
        let dir = tempfile::tempdir().unwrap();
        let driver = RunDriver::new(InProcessEstimator::default());
        let cfg = ScenarioConfig {
            p_detect: 2.0,
            ..Default::default()
        };
        let err = driver.run(&cfg, &dir.path().join("run")).unwrap_err();
        assert!(matches!(err, EvalError::InvalidConfig { .. }));
        assert!(!dir.path().join("run").exists());
    }
}
