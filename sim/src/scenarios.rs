//! Scenario definitions.
//!
//! Each scenario is a named motion/noise/clutter regime. The simulator also
//! enforces the regime's floor/ceiling on the configured parameters, so a
//! `clutter` run is always cluttered even if the caller passed clean values.
//! All scenarios are deterministic given the same seed.

use crate::config::ScenarioConfig;
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to run.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Constant velocity, nominal noise
    Cv,
    /// Velocity step change at the run midpoint
    Maneuver,
    /// Measurement noise std dev of at least 6 m
    #[value(name = "high_noise")]
    HighNoise,
    /// Missed detections and uniform clutter returns
    Clutter,
}

/// Noise/clutter parameters a scenario is run with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub kind: ScenarioKind,
    pub sigma_z: f64,
    pub p_detect: f64,
    pub clutter_prob: f64,
}

impl ScenarioKind {
    /// Enumeration order used by evaluation and dataset generation.
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::Cv,
        ScenarioKind::Maneuver,
        ScenarioKind::HighNoise,
        ScenarioKind::Clutter,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Cv => "cv",
            ScenarioKind::Maneuver => "maneuver",
            ScenarioKind::HighNoise => "high_noise",
            ScenarioKind::Clutter => "clutter",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Canonical parameters for this scenario.
    pub fn preset(&self) -> ScenarioPreset {
        let (sigma_z, p_detect, clutter_prob) = match self {
            ScenarioKind::Cv | ScenarioKind::Maneuver => (2.0, 1.0, 0.0),
            ScenarioKind::HighNoise => (6.0, 1.0, 0.0),
            ScenarioKind::Clutter => (2.0, 0.9, 0.25),
        };
        ScenarioPreset {
            kind: *self,
            sigma_z,
            p_detect,
            clutter_prob,
        }
    }

    /// Whether the truth trajectory changes velocity at the run midpoint.
    pub fn has_maneuver(&self) -> bool {
        matches!(self, ScenarioKind::Maneuver)
    }
}

/// Parameters the simulator actually uses for a run, after the scenario's
/// regime constraints are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct SimParams {
    pub dt: f64,
    pub steps: u32,
    pub sigma_z: f64,
    pub p_detect: f64,
    pub clutter_prob: f64,
    pub clutter_range: f64,
    pub maneuver: bool,
}

impl SimParams {
    /// Resolve the effective simulation parameters. Unknown scenario names
    /// run as plain constant velocity.
    pub fn resolve(config: &ScenarioConfig) -> Self {
        let kind = ScenarioKind::from_name(&config.name);
        let mut params = SimParams {
            dt: config.dt,
            steps: config.steps,
            sigma_z: config.sigma_z,
            p_detect: config.p_detect,
            clutter_prob: config.clutter_prob,
            clutter_range: config.clutter_range,
            maneuver: kind.is_some_and(|k| k.has_maneuver()),
        };
        match kind {
            Some(ScenarioKind::HighNoise) => {
                params.sigma_z = params.sigma_z.max(6.0);
            }
            Some(ScenarioKind::Clutter) => {
                params.clutter_prob = params.clutter_prob.max(0.25);
                params.p_detect = params.p_detect.min(0.9);
            }
            _ => {}
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ScenarioKind::ALL {
            assert_eq!(ScenarioKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScenarioKind::from_name("loiter"), None);
    }

    #[test]
    fn clutter_regime_is_enforced() {
        let cfg = ScenarioConfig {
            name: "clutter".into(),
            p_detect: 1.0,
            clutter_prob: 0.0,
            ..Default::default()
        };
        let p = SimParams::resolve(&cfg);
        assert_eq!(p.p_detect, 0.9);
        assert_eq!(p.clutter_prob, 0.25);
        assert!(!p.maneuver);
    }

    #[test]
    fn high_noise_floor_and_maneuver_flag() {
        let cfg = ScenarioConfig {
            name: "high_noise".into(),
            sigma_z: 2.0,
            ..Default::default()
        };
        assert_eq!(SimParams::resolve(&cfg).sigma_z, 6.0);

        let cfg = ScenarioConfig {
            name: "maneuver".into(),
            ..Default::default()
        };
        assert!(SimParams::resolve(&cfg).maneuver);
    }

    #[test]
    fn unknown_scenario_runs_unmodified() {
        let cfg = ScenarioConfig {
            name: "loiter".into(),
            sigma_z: 1.0,
            ..Default::default()
        };
        let p = SimParams::resolve(&cfg);
        assert_eq!(p.sigma_z, 1.0);
        assert!(!p.maneuver);
    }
}
