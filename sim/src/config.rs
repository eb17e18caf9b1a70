//! Run configuration: the full, immutable description of one simulation run.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracker_core::Mode;

/// Invariant violated by a [`ScenarioConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("steps must be > 0")]
    NoSteps,
    #[error("{field} must be within [0, 1], got {value}")]
    NotAProbability { field: &'static str, value: f64 },
    #[error("{field} must be finite and {bound}, got {value}")]
    OutOfRange {
        field: &'static str,
        bound: &'static str,
        value: f64,
    },
    #[error("scenario name must not be empty")]
    EmptyName,
}

/// Identifies exactly one simulation run.
///
/// Field order is the on-disk column order of `meta.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub mode: Mode,
    /// Scenario name (`cv`, `maneuver`, ...)
    #[serde(rename = "scenario")]
    pub name: String,
    /// Simulation step (s)
    pub dt: f64,
    pub seed: u64,
    pub steps: u32,
    /// Measurement noise std dev per axis (m)
    pub sigma_z: f64,
    /// Detection probability
    pub p_detect: f64,
    /// Probability that a detection is replaced by a clutter return
    pub clutter_prob: f64,
    /// Clutter returns are uniform in [-range, range]² (m)
    pub clutter_range: f64,
    /// Filter process noise spectral density
    #[serde(rename = "q")]
    pub process_noise_q: f64,
    /// Filter measurement noise variance (initial value in adaptive mode)
    #[serde(rename = "r")]
    pub measurement_noise_r: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Baseline,
            name: "cv".into(),
            dt: 0.02,
            seed: 123,
            steps: 500,
            sigma_z: 2.0,
            p_detect: 1.0,
            clutter_prob: 0.0,
            clutter_range: 80.0,
            process_noise_q: 1.0,
            measurement_noise_r: 4.0,
        }
    }
}

impl ScenarioConfig {
    /// Check the invariants every run relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        probability("p_detect", self.p_detect)?;
        probability("clutter_prob", self.clutter_prob)?;
        positive("dt", self.dt)?;
        positive("r", self.measurement_noise_r)?;
        non_negative("sigma_z", self.sigma_z)?;
        non_negative("clutter_range", self.clutter_range)?;
        non_negative("q", self.process_noise_q)?;
        Ok(())
    }

    /// Copy with a different estimator mode.
    pub fn with_mode(&self, mode: Mode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }
}

fn probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::NotAProbability { field, value })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            bound: "> 0",
            value,
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            bound: ">= 0",
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ScenarioConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_steps_and_bad_probabilities() {
        let cfg = ScenarioConfig {
            steps: 0,
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoSteps));

        let cfg = ScenarioConfig {
            p_detect: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotAProbability { field: "p_detect", .. })
        ));

        let cfg = ScenarioConfig {
            clutter_prob: f64::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_r() {
        let cfg = ScenarioConfig {
            measurement_noise_r: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange { field: "r", .. })
        ));
    }

    #[test]
    fn with_mode_keeps_everything_else() {
        let base = ScenarioConfig::default();
        let a1 = base.with_mode(Mode::A1);
        assert_eq!(a1.mode, Mode::A1);
        assert_eq!(a1.with_mode(Mode::Baseline), base);
    }
}
