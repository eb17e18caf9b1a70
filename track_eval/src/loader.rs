//! Artifact loader: reads the four streams and the meta record of a run and
//! joins them on the step index `k`.
//!
//! The join is explicit and typed. Truth, estimate and diagnostics must cover
//! exactly the same steps; a step missing from any of them is a schema error.
//! The measurement stream may lack steps (the record then carries no
//! measurement). No stream may hold a step that truth lacks. Truth and estimate share column names, so each lives in its
//! own tagged field of [`MergedRecord`] and is flattened as `_truth` / `_est`.

use crate::error::{EvalError, Result};
use serde::de::DeserializeOwned;
use sim::artifact::{
    DiagRow, MeasRow, StateRow, DIAG_FILE, EST_FILE, MEAS_FILE, META_FILE, TRUTH_FILE,
};
use sim::ScenarioConfig;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One time step with fields from every stream.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedRecord {
    pub k: u32,
    pub truth: StateRow,
    /// `None` when the measurement stream has no row for this step
    pub measurement: Option<MeasRow>,
    pub estimate: StateRow,
    pub diagnostics: DiagRow,
}

impl MergedRecord {
    /// Whether a real measurement was processed at this step.
    pub fn has_valid_measurement(&self) -> bool {
        self.measurement.is_some_and(|m| m.valid)
    }

    pub fn position_error(&self) -> f64 {
        (self.estimate.x - self.truth.x).hypot(self.estimate.y - self.truth.y)
    }

    pub fn velocity_error(&self) -> f64 {
        (self.estimate.vx - self.truth.vx).hypot(self.estimate.vy - self.truth.vy)
    }
}

/// A run's joined records plus its metadata, which applies to every record.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedRun {
    pub meta: ScenarioConfig,
    /// Ascending in `k`, no gaps relative to the truth stream
    pub records: Vec<MergedRecord>,
}

/// Load and join the artifact in `dir`.
pub fn load_run(dir: &Path) -> Result<MergedRun> {
    let truth = read_stream::<StateRow>(dir, TRUTH_FILE)?;
    let meas = read_stream::<MeasRow>(dir, MEAS_FILE)?;
    let est = read_stream::<StateRow>(dir, EST_FILE)?;
    let diag = read_stream::<DiagRow>(dir, DIAG_FILE)?;
    let meta = read_meta(dir)?;

    let truth = index_by_step(dir, TRUTH_FILE, truth, |r| r.k)?;
    let meas = index_by_step(dir, MEAS_FILE, meas, |r| r.k)?;
    let est = index_by_step(dir, EST_FILE, est, |r| r.k)?;
    let diag = index_by_step(dir, DIAG_FILE, diag, |r| r.k)?;

    for (name, rows) in [(TRUTH_FILE, &truth), (EST_FILE, &est)] {
        for row in rows.values() {
            check_finite(dir, name, row.k, &[row.x, row.y, row.vx, row.vy])?;
        }
    }
    for row in diag.values() {
        check_finite(
            dir,
            DIAG_FILE,
            row.k,
            &[row.yx, row.yy, row.sx, row.sy, row.nis, row.q, row.r],
        )?;
    }

    let records = join(dir, &truth, &meas, &est, &diag)?;
    debug!(
        dir = %dir.display(),
        scenario = %meta.name,
        seed = meta.seed,
        rows = records.len(),
        "loaded run"
    );
    Ok(MergedRun { meta, records })
}

/// Inner join on `k`, driven by the truth stream.
fn join(
    dir: &Path,
    truth: &BTreeMap<u32, StateRow>,
    meas: &BTreeMap<u32, MeasRow>,
    est: &BTreeMap<u32, StateRow>,
    diag: &BTreeMap<u32, DiagRow>,
) -> Result<Vec<MergedRecord>> {
    check_covered_by_truth(dir, EST_FILE, est.keys(), truth)?;
    check_covered_by_truth(dir, DIAG_FILE, diag.keys(), truth)?;
    check_covered_by_truth(dir, MEAS_FILE, meas.keys(), truth)?;

    truth
        .iter()
        .map(|(&k, truth_row)| {
            let estimate = *est.get(&k).ok_or_else(|| missing_step(dir, EST_FILE, k))?;
            let diagnostics = *diag.get(&k).ok_or_else(|| missing_step(dir, DIAG_FILE, k))?;
            Ok(MergedRecord {
                k,
                truth: *truth_row,
                measurement: meas.get(&k).copied(),
                estimate,
                diagnostics,
            })
        })
        .collect()
}

fn check_covered_by_truth<'a>(
    dir: &Path,
    name: &str,
    mut keys: impl Iterator<Item = &'a u32>,
    truth: &BTreeMap<u32, StateRow>,
) -> Result<()> {
    match keys.find(|k| !truth.contains_key(k)) {
        Some(k) => Err(EvalError::schema(
            dir.join(name),
            format!("step k={k} has no matching row in {TRUTH_FILE}"),
        )),
        None => Ok(()),
    }
}

fn missing_step(dir: &Path, file: &str, k: u32) -> EvalError {
    EvalError::schema(
        dir.join(file),
        format!("missing step k={k} present in {TRUTH_FILE}"),
    )
}

fn read_stream<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let path = dir.join(name);
    let mut reader = csv::Reader::from_path(&path).map_err(|e| match e.into_kind() {
        csv::ErrorKind::Io(io) => EvalError::io(&path, io),
        other => EvalError::schema(&path, format!("{other:?}")),
    })?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| EvalError::schema(&path, e.to_string())))
        .collect()
}

fn read_meta(dir: &Path) -> Result<ScenarioConfig> {
    let path = dir.join(META_FILE);
    let mut rows = read_stream::<ScenarioConfig>(dir, META_FILE)?;
    match rows.len() {
        1 => Ok(rows.remove(0)),
        n => Err(EvalError::schema(
            path,
            format!("expected exactly one metadata row, found {n}"),
        )),
    }
}

fn index_by_step<T>(
    dir: &Path,
    name: &str,
    rows: Vec<T>,
    key: impl Fn(&T) -> u32,
) -> Result<BTreeMap<u32, T>> {
    let mut map = BTreeMap::new();
    for row in rows {
        let k = key(&row);
        if map.insert(k, row).is_some() {
            return Err(EvalError::schema(
                dir.join(name),
                format!("duplicate step k={k}"),
            ));
        }
    }
    Ok(map)
}

fn check_finite(dir: &Path, name: &str, k: u32, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(EvalError::schema(
            dir.join(name),
            format!("non-finite value at step k={k}"),
        ))
    }
}
