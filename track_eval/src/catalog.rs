//! Scenario catalog: the named configurations shared by evaluation and
//! dataset generation, and the seeding rule for dataset runs.

use sim::{artifact::fnv1a64, ScenarioConfig, ScenarioKind, ScenarioPreset};
use tracker_core::Mode;

/// Run-wide parameters applied to every catalog entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunParams {
    pub steps: u32,
    pub dt: f64,
    pub q: f64,
    pub r: f64,
    pub clutter_range: f64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            steps: 500,
            dt: 0.02,
            q: 1.0,
            r: 4.0,
            clutter_range: 80.0,
        }
    }
}

/// Ordered list of scenario presets.
#[derive(Clone, Debug)]
pub struct ScenarioCatalog {
    entries: Vec<ScenarioPreset>,
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ScenarioCatalog {
    /// `cv`, `maneuver`, `high_noise`, `clutter`, in that order.
    pub fn standard() -> Self {
        Self::from_kinds(&ScenarioKind::ALL)
    }

    pub fn from_kinds(kinds: &[ScenarioKind]) -> Self {
        Self {
            entries: kinds.iter().map(ScenarioKind::preset).collect(),
        }
    }

    pub fn entries(&self) -> &[ScenarioPreset] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configs for one seed and mode, in catalog order.
    pub fn configs(&self, seed: u64, mode: Mode, params: &RunParams) -> Vec<ScenarioConfig> {
        self.entries
            .iter()
            .map(|preset| scenario_config(preset, seed, mode, params))
            .collect()
    }

    /// Configs for dataset generation: `seeds` runs per scenario, scenario-major.
    pub fn dataset_configs(
        &self,
        seeds: u32,
        base_seed: u64,
        mode: Mode,
        params: &RunParams,
    ) -> Vec<ScenarioConfig> {
        self.entries
            .iter()
            .flat_map(|preset| {
                (0..seeds).map(move |i| {
                    let seed = dataset_seed(preset.kind.name(), base_seed, i);
                    scenario_config(preset, seed, mode, params)
                })
            })
            .collect()
    }
}

/// Materialise one preset into a full run config.
pub fn scenario_config(
    preset: &ScenarioPreset,
    seed: u64,
    mode: Mode,
    params: &RunParams,
) -> ScenarioConfig {
    ScenarioConfig {
        mode,
        name: preset.kind.name().to_string(),
        dt: params.dt,
        seed,
        steps: params.steps,
        sigma_z: preset.sigma_z,
        p_detect: preset.p_detect,
        clutter_prob: preset.clutter_prob,
        clutter_range: params.clutter_range,
        process_noise_q: params.q,
        measurement_noise_r: params.r,
    }
}

/// Seed of the `i`-th dataset run of `scenario`:
/// `base + 1000·i + (fnv1a64(scenario) & 0xFF)`.
pub fn dataset_seed(scenario: &str, base_seed: u64, i: u32) -> u64 {
    base_seed + 1000 * u64::from(i) + (fnv1a64(scenario.as_bytes()) & 0xFF)
}
