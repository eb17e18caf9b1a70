//! `sim`: target trajectory and position-measurement simulation, run
//! artifacts, and the reference estimator run loop.

pub mod artifact;
pub mod config;
pub mod run;
pub mod scenarios;
pub mod sensor;
pub mod target;

pub use config::{ConfigError, ScenarioConfig};
pub use run::{execute, RunOptions, RunSummary};
pub use scenarios::{ScenarioKind, ScenarioPreset, SimParams};
pub use sensor::{Observation, PositionSensor};
pub use target::{Target, TruthState};
pub use tracker_core::Mode;
