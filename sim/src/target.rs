//! Target trajectory model and state propagation.
//!
//! The target has a planar true state [px, py, vx, vy] and moves at constant
//! velocity. A manoeuvring target applies one deterministic velocity change
//! at the run midpoint.

use serde::{Deserialize, Serialize};

/// Velocity scale factors applied at the manoeuvre step.
const MANEUVER_VX_SCALE: f64 = 0.55;
const MANEUVER_VY_SCALE: f64 = 1.65;

/// True target state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TruthState {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Default for TruthState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            vx: 1.0,
            vy: 0.5,
        }
    }
}

/// A simulated target with ground-truth state.
#[derive(Clone, Debug)]
pub struct Target {
    pub state: TruthState,
    /// Step index at which the manoeuvre fires, if any
    pub maneuver_at: Option<u32>,
}

impl Target {
    pub fn new(state: TruthState, maneuver_at: Option<u32>) -> Self {
        Self { state, maneuver_at }
    }

    /// Propagate true state by `dt` seconds; step `k` is the index being produced.
    pub fn step(&mut self, k: u32, dt: f64) -> TruthState {
        let s = &mut self.state;
        s.x += s.vx * dt;
        s.y += s.vy * dt;

        if self.maneuver_at == Some(k) {
            s.vx *= MANEUVER_VX_SCALE;
            s.vy *= MANEUVER_VY_SCALE;
        }
        *s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn constant_velocity_propagation() {
        let mut t = Target::new(TruthState::default(), None);
        for k in 0..10 {
            t.step(k, 0.1);
        }
        assert_abs_diff_eq!(t.state.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.state.y, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.state.vx.hypot(t.state.vy), 1.25f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn maneuver_fires_once_at_its_step() {
        let mut t = Target::new(TruthState::default(), Some(5));
        for k in 0..5 {
            assert_eq!(t.step(k, 0.02).vx, 1.0);
        }
        let s = t.step(5, 0.02);
        assert_abs_diff_eq!(s.vx, 0.55, epsilon = 1e-12);
        assert_abs_diff_eq!(s.vy, 0.825, epsilon = 1e-12);
        let s = t.step(6, 0.02);
        assert_abs_diff_eq!(s.vx, 0.55, epsilon = 1e-12);
    }
}
