//! Dataset builder: flattens joined runs into feature/label rows.

use crate::loader::{MergedRecord, MergedRun};
use serde::{Deserialize, Serialize};
use sim::ScenarioConfig;
use tracing::debug;

/// Process-noise label outside a manoeuvre.
pub const Q_LABEL_NOMINAL: f64 = 1.5;
/// Process-noise label for the second half of the `maneuver` scenario.
pub const Q_LABEL_MANEUVER: f64 = 8.0;

const MANEUVER_SCENARIO: &str = "maneuver";

/// One flattened time step. Field order is the CSV column order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub k: u32,
    pub x_truth: f64,
    pub y_truth: f64,
    pub vx_truth: f64,
    pub vy_truth: f64,
    pub zx: Option<f64>,
    pub zy: Option<f64>,
    pub valid: u8,
    pub x_est: f64,
    pub y_est: f64,
    pub vx_est: f64,
    pub vy_est: f64,
    pub yx: f64,
    pub yy: f64,
    #[serde(rename = "Sx")]
    pub sx: f64,
    #[serde(rename = "Sy")]
    pub sy: f64,
    #[serde(rename = "NIS")]
    pub nis: f64,
    pub q: f64,
    pub r: f64,
    pub scenario: String,
    pub dt: f64,
    pub seed: u64,
    pub steps: u32,
    pub sigma_z: f64,
    pub p_detect: f64,
    pub clutter_prob: f64,
    pub clutter_range: f64,
    pub speed: f64,
    pub q_true: f64,
    pub r_true: f64,
}

/// Ground-truth process-noise label at step `k`.
pub fn q_label(scenario: &str, k: u32, steps: u32) -> f64 {
    if scenario == MANEUVER_SCENARIO && k >= steps / 2 {
        Q_LABEL_MANEUVER
    } else {
        Q_LABEL_NOMINAL
    }
}

impl DatasetRow {
    pub fn from_record(record: &MergedRecord, meta: &ScenarioConfig) -> Self {
        let t = &record.truth;
        let e = &record.estimate;
        let d = &record.diagnostics;
        let (zx, zy, valid) = match record.measurement {
            Some(m) => (Some(m.zx), Some(m.zy), u8::from(m.valid)),
            None => (None, None, 0),
        };
        Self {
            k: record.k,
            x_truth: t.x,
            y_truth: t.y,
            vx_truth: t.vx,
            vy_truth: t.vy,
            zx,
            zy,
            valid,
            x_est: e.x,
            y_est: e.y,
            vx_est: e.vx,
            vy_est: e.vy,
            yx: d.yx,
            yy: d.yy,
            sx: d.sx,
            sy: d.sy,
            nis: d.nis,
            q: d.q,
            r: d.r,
            scenario: meta.name.clone(),
            dt: meta.dt,
            seed: meta.seed,
            steps: meta.steps,
            sigma_z: meta.sigma_z,
            p_detect: meta.p_detect,
            clutter_prob: meta.clutter_prob,
            clutter_range: meta.clutter_range,
            speed: t.vx.hypot(t.vy),
            q_true: q_label(&meta.name, record.k, meta.steps),
            r_true: meta.sigma_z * meta.sigma_z,
        }
    }
}

/// Rows from many runs, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every record of `run`, keeping its `k` order.
    pub fn extend_run(&mut self, run: &MergedRun) {
        self.rows.extend(
            run.records
                .iter()
                .map(|rec| DatasetRow::from_record(rec, &run.meta)),
        );
        debug!(
            scenario = %run.meta.name,
            seed = run.meta.seed,
            rows = run.records.len(),
            total = self.rows.len(),
            "appended run to dataset"
        );
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<DatasetRow> for Dataset {
    fn from_iter<I: IntoIterator<Item = DatasetRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sim::artifact::{DiagRow, MeasRow, StateRow};

    fn run(name: &str, steps: u32, with_meas: bool) -> MergedRun {
        let meta = ScenarioConfig {
            name: name.into(),
            steps,
            sigma_z: 3.0,
            ..Default::default()
        };
        let records = (0..steps)
            .map(|k| {
                let truth = StateRow {
                    k,
                    x: k as f64,
                    y: 0.0,
                    vx: 3.0,
                    vy: 4.0,
                };
                MergedRecord {
                    k,
                    truth,
                    measurement: with_meas.then_some(MeasRow {
                        k,
                        zx: 1.0,
                        zy: 2.0,
                        valid: true,
                    }),
                    estimate: truth,
                    diagnostics: DiagRow {
                        k,
                        yx: 0.0,
                        yy: 0.0,
                        sx: 1.0,
                        sy: 1.0,
                        nis: 0.5,
                        q: 1.0,
                        r: 7.5,
                        nis_ema: None,
                    },
                }
            })
            .collect();
        MergedRun { meta, records }
    }

    #[test]
    fn derived_columns() {
        let mut ds = Dataset::new();
        ds.extend_run(&run("cv", 4, true));
        let row = &ds.rows[0];
        assert_abs_diff_eq!(row.speed, 5.0, epsilon = 1e-12);
        assert_eq!(row.r_true, 9.0);
        assert_eq!(row.q_true, Q_LABEL_NOMINAL);
        // q/r come from diagnostics, not from the configuration
        assert_eq!(row.r, 7.5);
        assert_eq!(row.valid, 1);
    }

    #[test]
    fn maneuver_label_switches_at_half_way() {
        assert_eq!(q_label("maneuver", 4, 10), Q_LABEL_NOMINAL);
        assert_eq!(q_label("maneuver", 5, 10), Q_LABEL_MANEUVER);
        // integer halving: 11 / 2 == 5
        assert_eq!(q_label("maneuver", 5, 11), Q_LABEL_MANEUVER);
        assert_eq!(q_label("cv", 9, 10), Q_LABEL_NOMINAL);
        assert_eq!(q_label("clutter", 9, 10), Q_LABEL_NOMINAL);
    }

    #[test]
    fn runs_concatenate_in_insertion_order() {
        let mut ds = Dataset::new();
        ds.extend_run(&run("maneuver", 3, true));
        ds.extend_run(&run("cv", 2, true));
        let keys: Vec<_> = ds.rows.iter().map(|r| (r.scenario.as_str(), r.k)).collect();
        assert_eq!(
            keys,
            [("maneuver", 0), ("maneuver", 1), ("maneuver", 2), ("cv", 0), ("cv", 1)]
        );
    }

    #[test]
    fn missing_measurement_leaves_blank_cells() {
        let mut ds = Dataset::new();
        ds.extend_run(&run("cv", 1, false));

        let mut w = csv::Writer::from_writer(Vec::new());
        w.serialize(&ds.rows[0]).unwrap();
        let text = String::from_utf8(w.into_inner().unwrap()).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("k,x_truth,y_truth,vx_truth,vy_truth,zx,zy,valid,x_est"));
        assert!(header.ends_with("clutter_range,speed,q_true,r_true"));
        assert!(lines.next().unwrap().starts_with("0,0.0,0.0,3.0,4.0,,,0,"));
    }
}
