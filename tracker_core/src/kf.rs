//! Kalman filter: predict and update steps.
//!
//! # Design choices
//! - A **linear KF** with a constant-velocity (CV) motion model in the plane.
//! - All math is done in `f64` via `nalgebra` fixed-size matrices.
//! - Innovation statistics are computed against the predicted state, before
//!   the update, so NIS reflects how well the prior explains the measurement.
//!
//! ## State vector
//! x = [px, py, vx, vy]ᵀ  (4-dimensional)
//!
//! ## CV Transition model
//! F = I₄ + dt * [[0₂ I₂]; [0₂ 0₂]]
//!
//! ## Process noise Q (discrete white noise acceleration)
//! Q = q * [[dt⁴/4 I₂, dt³/2 I₂]; [dt³/2 I₂, dt² I₂]]

use crate::types::{InnovationDiag, MeasCov, MeasVec, ObsMat, StateCov, StateVec};

/// Smallest measurement variance the filter accepts; keeps S invertible.
const R_FLOOR: f64 = 1e-12;

/// Configuration for the CV Kalman filter.
#[derive(Clone, Debug)]
pub struct CvKfConfig {
    /// Process noise spectral density (acceleration variance, m²/s⁴).
    pub q: f64,
    /// Measurement noise variance per axis (m²).
    pub r: f64,
    /// Velocity std dev assumed when a track is initialised from one fix (m/s).
    pub init_vel_std: f64,
}

impl Default for CvKfConfig {
    fn default() -> Self {
        Self {
            q: 1.0,
            r: 4.0,
            init_vel_std: 5.0,
        }
    }
}

/// Result of a KF update step.
#[derive(Clone, Debug)]
pub struct KfUpdateResult {
    pub state: StateVec,
    pub cov: StateCov,
    pub diag: InnovationDiag,
}

/// Constant-Velocity Kalman filter (4-state, linear) with its running estimate.
///
/// The filter initialises itself from the first measurement it receives;
/// before that the estimate stays at the origin with zero velocity.
#[derive(Clone, Debug)]
pub struct CvKalmanFilter {
    pub config: CvKfConfig,
    dt: f64,
    state: StateVec,
    cov: StateCov,
    initialized: bool,
}

impl CvKalmanFilter {
    pub fn new(dt: f64, config: CvKfConfig) -> Self {
        Self {
            config,
            dt,
            state: StateVec::zeros(),
            cov: StateCov::identity(),
            initialized: false,
        }
    }

    /// Build state transition matrix F for timestep dt.
    pub fn transition_matrix(dt: f64) -> StateCov {
        let mut f = StateCov::identity();
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;
        f
    }

    /// Build process noise matrix Q for timestep dt.
    fn process_noise(dt: f64, q: f64) -> StateCov {
        let dt2 = dt * dt;
        let dt3 = dt2 * dt;
        let dt4 = dt3 * dt;

        let mut qm = StateCov::zeros();
        for i in 0..2usize {
            qm[(i, i)] = q * dt4 / 4.0;
            qm[(i + 2, i + 2)] = q * dt2;
            qm[(i, i + 2)] = q * dt3 / 2.0;
            qm[(i + 2, i)] = q * dt3 / 2.0;
        }
        qm
    }

    /// Observation matrix H: z = [px, py].
    pub fn observation_matrix() -> ObsMat {
        ObsMat::new(1., 0., 0., 0., 0., 1., 0., 0.)
    }

    fn measurement_noise(&self) -> MeasCov {
        MeasCov::identity() * self.config.r.max(R_FLOOR)
    }

    /// Current state estimate.
    pub fn state(&self) -> &StateVec {
        &self.state
    }

    pub fn covariance(&self) -> &StateCov {
        &self.cov
    }

    /// Whether a measurement has initialised the track.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Measurement noise variance currently in use.
    pub fn r(&self) -> f64 {
        self.config.r
    }

    /// Replace the measurement noise variance used by subsequent updates.
    pub fn set_r(&mut self, r: f64) {
        self.config.r = r;
    }

    /// Predict the running estimate forward by one step.
    pub fn predict(&mut self) {
        let f = Self::transition_matrix(self.dt);
        let q = Self::process_noise(self.dt, self.config.q);
        self.state = f * self.state;
        self.cov = f * self.cov * f.transpose() + q;
    }

    /// Innovation statistics of `z` against the current (predicted) estimate.
    pub fn innovation(&self, z: &MeasVec) -> (InnovationDiag, MeasCov) {
        let h = Self::observation_matrix();
        let nu = z - h * self.state;
        let s = h * self.cov * h.transpose() + self.measurement_noise();
        let nis = match s.try_inverse() {
            Some(s_inv) => (nu.transpose() * s_inv * nu)[(0, 0)],
            None => f64::INFINITY,
        };
        let diag = InnovationDiag {
            yx: nu[0],
            yy: nu[1],
            sx: s[(0, 0)],
            sy: s[(1, 1)],
            nis,
        };
        (diag, s)
    }

    /// Update the running estimate with measurement `z`.
    pub fn update(&self, z: &MeasVec) -> KfUpdateResult {
        let h = Self::observation_matrix();
        let r = self.measurement_noise();
        let (diag, s) = self.innovation(z);

        let Some(s_inv) = s.try_inverse() else {
            return KfUpdateResult {
                state: self.state,
                cov: self.cov,
                diag,
            };
        };

        // Kalman gain: K = P·Hᵀ·S⁻¹
        let k = self.cov * h.transpose() * s_inv;
        let nu = MeasVec::new(diag.yx, diag.yy);
        let state = self.state + k * nu;

        // Joseph form P' = (I−KH)·P·(I−KH)ᵀ + K·R·Kᵀ
        let i_kh = StateCov::identity() - k * h;
        let cov = i_kh * self.cov * i_kh.transpose() + k * r * k.transpose();

        KfUpdateResult { state, cov, diag }
    }

    /// One filter cycle: predict, then update when a measurement is present.
    ///
    /// Steps without a measurement report a zero innovation and zero NIS.
    pub fn step(&mut self, z: Option<MeasVec>) -> InnovationDiag {
        let Some(z) = z else {
            if self.initialized {
                self.predict();
            }
            let s = Self::observation_matrix() * self.cov * Self::observation_matrix().transpose()
                + self.measurement_noise();
            return InnovationDiag {
                sx: s[(0, 0)],
                sy: s[(1, 1)],
                ..Default::default()
            };
        };

        if !self.initialized {
            return self.initialize(&z);
        }

        self.predict();
        let res = self.update(&z);
        self.state = res.state;
        self.cov = res.cov;
        res.diag
    }

    fn initialize(&mut self, z: &MeasVec) -> InnovationDiag {
        let r = self.config.r.max(R_FLOOR);
        let v2 = self.config.init_vel_std * self.config.init_vel_std;
        self.state = StateVec::new(z[0], z[1], 0.0, 0.0);
        self.cov = StateCov::from_diagonal(&StateVec::new(r, r, v2, v2));
        self.initialized = true;
        InnovationDiag {
            sx: 2.0 * r,
            sy: 2.0 * r,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
