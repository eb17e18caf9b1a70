//! `tracker_core`: Reference single-target estimator.
//!
//! # Module layout
//! - [`types`]    : State/measurement aliases, estimator [`Mode`], innovation diagnostics
//! - [`kf`]       : Planar constant-velocity Kalman filter (predict / update)
//! - [`adaptive`] : NIS-driven online measurement-noise tuner ("a1" mode)

pub mod adaptive;
pub mod kf;
pub mod types;

pub use adaptive::{AdaptiveRTuner, TunerConfig};
pub use kf::{CvKalmanFilter, CvKfConfig};
pub use types::{InnovationDiag, MeasVec, Mode, StateVec, MEAS_DIM};
