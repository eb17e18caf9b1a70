//! "A1" online measurement-noise tuning.
//!
//! Keeps an exponential moving average of NIS and nudges the measurement
//! variance `r` multiplicatively toward the value that makes the average
//! match its target (the measurement dimension). NIS above target means the
//! filter is overconfident, so `r` grows; below target it shrinks.
//!
//! Instantaneous NIS spikes (clutter returns) inflate `r` immediately by a
//! bounded factor, ahead of the slower EMA path.

use serde::{Deserialize, Serialize};

/// Tuning constants for [`AdaptiveRTuner`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TunerConfig {
    /// Expected mean NIS for a 2D measurement
    pub target_nis: f64,
    /// EMA smoothing factor in (0, 1); higher adapts more slowly
    pub nis_ema_alpha: f64,
    /// Exponent applied to the NIS ratio, clamped to [0, 1]
    pub gain: f64,
    /// No change while |ema − target| stays below this
    pub deadband: f64,
    /// Lower clamp for r (variance)
    pub r_min: f64,
    /// Upper clamp for r (variance)
    pub r_max: f64,
    /// Instantaneous NIS above this counts as a spike
    pub spike_nis: f64,
    /// Fractional r bump per spike at the cap ratio
    pub spike_gain: f64,
    /// Cap on nis/target used to scale the spike bump
    pub spike_cap_ratio: f64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            target_nis: 2.0,
            nis_ema_alpha: 0.97,
            gain: 0.03,
            deadband: 0.25,
            r_min: 0.2,
            r_max: 100.0,
            spike_nis: 50.0,
            spike_gain: 0.20,
            spike_cap_ratio: 50.0,
        }
    }
}

/// Stateful tuner; call [`AdaptiveRTuner::step`] once per valid measurement.
#[derive(Clone, Debug)]
pub struct AdaptiveRTuner {
    config: TunerConfig,
    nis_ema: Option<f64>,
}

impl AdaptiveRTuner {
    pub fn new(config: TunerConfig) -> Self {
        Self {
            config,
            nis_ema: None,
        }
    }

    /// Current NIS moving average, if any measurement has been seen.
    pub fn nis_ema(&self) -> Option<f64> {
        self.nis_ema
    }

    /// Fold `nis` into the moving average and return the retuned `r`.
    pub fn step(&mut self, nis: f64, current_r: f64) -> f64 {
        let cfg = &self.config;
        let nis = if nis.is_finite() && nis >= 0.0 { nis } else { 0.0 };
        let current_r = if current_r.is_finite() && current_r > 0.0 {
            current_r
        } else {
            cfg.r_min
        };

        let ema = match self.nis_ema {
            None => nis,
            Some(prev) => cfg.nis_ema_alpha * prev + (1.0 - cfg.nis_ema_alpha) * nis,
        };
        self.nis_ema = Some(ema);

        let target = cfg.target_nis.max(1e-9);
        let mut r = current_r;

        if nis > cfg.spike_nis {
            let ratio = (nis / target).min(cfg.spike_cap_ratio.max(1.0));
            let scale = ratio / cfg.spike_cap_ratio.max(1.0);
            r *= 1.0 + cfg.spike_gain.max(0.0) * scale;
        } else if (ema - target).abs() >= cfg.deadband {
            let ratio = (ema / target).clamp(0.05, 20.0);
            r *= ratio.powf(cfg.gain.clamp(0.0, 1.0));
        }

        r.clamp(cfg.r_min, cfg.r_max)
    }
}
