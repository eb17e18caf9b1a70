//! Position sensor simulator.
//!
//! Generates one measurement per step with:
//! - Gaussian position noise (per-axis std dev `sigma_z`)
//! - Miss probability (1 - P_D)
//! - Clutter: with probability `clutter_prob` a detection is replaced by a
//!   false return drawn uniformly from the square [-range, range]²

use crate::target::TruthState;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// One observation. Missed detections keep deterministic zero coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub zx: f64,
    pub zy: f64,
    pub valid: bool,
}

impl Observation {
    pub fn missed() -> Self {
        Self {
            zx: 0.0,
            zy: 0.0,
            valid: false,
        }
    }
}

/// Seeded measurement generator.
pub struct PositionSensor {
    pub sigma_z: f64,
    pub p_detect: f64,
    pub clutter_prob: f64,
    pub clutter_range: f64,
    rng: ChaCha8Rng,
}

impl PositionSensor {
    pub fn new(sigma_z: f64, p_detect: f64, clutter_prob: f64, clutter_range: f64, seed: u64) -> Self {
        Self {
            sigma_z,
            p_detect,
            clutter_prob,
            clutter_range,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Standard normal sample (Box–Muller, cosine branch).
    fn randn(&mut self) -> f64 {
        let u1 = self.rng.gen::<f64>().max(1e-12);
        let u2 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Observe the target at its current true state.
    pub fn observe(&mut self, truth: &TruthState) -> Observation {
        if self.rng.gen::<f64>() >= self.p_detect {
            return Observation::missed();
        }

        let mut zx = truth.x + self.sigma_z * self.randn();
        let mut zy = truth.y + self.sigma_z * self.randn();

        if self.clutter_prob > 0.0 && self.rng.gen::<f64>() < self.clutter_prob {
            let range = self.clutter_range;
            zx = self.rng.gen_range(-range..=range);
            zy = self.rng.gen_range(-range..=range);
        }

        Observation {
            zx,
            zy,
            valid: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_measurements() {
        let truth = TruthState::default();
        let mut a = PositionSensor::new(2.0, 0.9, 0.2, 80.0, 7);
        let mut b = PositionSensor::new(2.0, 0.9, 0.2, 80.0, 7);
        for _ in 0..100 {
            assert_eq!(a.observe(&truth), b.observe(&truth));
        }
    }

    #[test]
    fn zero_detection_probability_never_detects() {
        let mut s = PositionSensor::new(2.0, 0.0, 0.0, 80.0, 1);
        for _ in 0..100 {
            assert_eq!(s.observe(&TruthState::default()), Observation::missed());
        }
    }

    #[test]
    fn noise_has_roughly_configured_spread() {
        let truth = TruthState {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        };
        let mut s = PositionSensor::new(2.0, 1.0, 0.0, 80.0, 42);
        let n = 4000;
        let var: f64 = (0..n)
            .map(|_| {
                let o = s.observe(&truth);
                o.zx * o.zx
            })
            .sum::<f64>()
            / n as f64;
        assert!((var - 4.0).abs() < 0.5, "sample variance {var}");
    }

    #[test]
    fn clutter_stays_in_range() {
        let mut s = PositionSensor::new(0.0, 1.0, 1.0, 10.0, 3);
        for _ in 0..200 {
            let o = s.observe(&TruthState::default());
            assert!(o.valid);
            assert!(o.zx.abs() <= 10.0 && o.zy.abs() <= 10.0);
        }
    }
}
