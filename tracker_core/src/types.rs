//! Fundamental types used across the entire workspace.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar type: use f64 throughout for numerical precision in Kalman filter.
// ---------------------------------------------------------------------------

/// Planar state vector: [px, py, vx, vy]
pub type StateVec = Vector4<f64>;

/// 4×4 state covariance matrix
pub type StateCov = Matrix4<f64>;

/// Position measurement [zx, zy]
pub type MeasVec = Vector2<f64>;

/// 2×2 measurement-space matrix (R, S)
pub type MeasCov = Matrix2<f64>;

/// 2×4 observation matrix H
pub type ObsMat = Matrix2x4<f64>;

/// Dimension of the position measurement. The expected mean NIS of a
/// consistent filter equals this value.
pub const MEAS_DIM: usize = 2;

// ---------------------------------------------------------------------------
// Estimator mode
// ---------------------------------------------------------------------------

/// Which estimator variant produced a run.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fixed-parameter filter
    #[default]
    Baseline,
    /// Online measurement-noise adaptation driven by NIS
    A1,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Baseline, Mode::A1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Baseline => "baseline",
            Mode::A1 => "a1",
        }
    }

    /// Whether this mode retunes R online.
    pub fn is_adaptive(&self) -> bool {
        matches!(self, Mode::A1)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Mode::Baseline),
            "a1" => Ok(Mode::A1),
            other => Err(format!("unknown mode '{other}' (expected baseline|a1)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-step filter diagnostics
// ---------------------------------------------------------------------------

/// Innovation statistics for one filter step, computed before the update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InnovationDiag {
    /// Innovation ν = z − H·x̂⁻ (x component)
    pub yx: f64,
    /// Innovation (y component)
    pub yy: f64,
    /// Innovation covariance diagonal S_xx
    pub sx: f64,
    /// Innovation covariance diagonal S_yy
    pub sy: f64,
    /// Normalized innovation squared νᵀ·S⁻¹·ν
    pub nis: f64,
}
