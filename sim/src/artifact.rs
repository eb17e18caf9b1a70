//! Run artifact: the on-disk CSV layout of one estimator run.
//!
//! ```text
//! <out>/truth.csv  k,x,y,vx,vy
//! <out>/meas.csv   k,zx,zy,valid
//! <out>/est.csv    k,x,y,vx,vy
//! <out>/diag.csv   k,yx,yy,Sx,Sy,NIS,q,r,nis_ema
//! <out>/meta.csv   one row echoing the ScenarioConfig
//! ```
//!
//! Row types are shared by the writer here and by readers downstream.

use crate::config::ScenarioConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const TRUTH_FILE: &str = "truth.csv";
pub const MEAS_FILE: &str = "meas.csv";
pub const EST_FILE: &str = "est.csv";
pub const DIAG_FILE: &str = "diag.csv";
pub const META_FILE: &str = "meta.csv";

/// Files covered by the run digest, in hashing order.
pub const STREAM_FILES: [&str; 4] = [TRUTH_FILE, MEAS_FILE, EST_FILE, DIAG_FILE];

/// True (`truth.csv`) or estimated (`est.csv`) kinematic state at step `k`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateRow {
    pub k: u32,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

/// Observed position at step `k`; `valid` is written as 0/1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasRow {
    pub k: u32,
    pub zx: f64,
    pub zy: f64,
    #[serde(with = "bool01")]
    pub valid: bool,
}

/// Filter diagnostics at step `k`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagRow {
    pub k: u32,
    pub yx: f64,
    pub yy: f64,
    #[serde(rename = "Sx")]
    pub sx: f64,
    #[serde(rename = "Sy")]
    pub sy: f64,
    #[serde(rename = "NIS")]
    pub nis: f64,
    /// Process noise in use at this step
    pub q: f64,
    /// Measurement noise variance in use after this step's adaptation
    pub r: f64,
    /// Adaptive tuner's NIS moving average (empty when not adapting)
    #[serde(default)]
    pub nis_ema: Option<f64>,
}

/// Serde adapter writing `bool` as `0`/`1`.
pub mod bool01 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match u8::deserialize(d)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(de::Error::custom(format!("expected 0 or 1, got {other}"))),
        }
    }
}

/// 64-bit FNV-1a.
pub fn fnv1a64(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in data {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    h
}

/// XOR of the FNV-1a hashes of every data line of the four stream files in
/// `dir`. Headers and line terminators are not hashed.
pub fn stream_digest(dir: &Path) -> Result<u64> {
    STREAM_FILES.iter().try_fold(0u64, |acc, name| {
        let path = dir.join(name);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(text
            .lines()
            .skip(1)
            .fold(acc, |h, line| h ^ fnv1a64(line.as_bytes())))
    })
}

/// Streams rows of one run into the five artifact files.
pub struct ArtifactWriter {
    dir: PathBuf,
    truth: csv::Writer<std::fs::File>,
    meas: csv::Writer<std::fs::File>,
    est: csv::Writer<std::fs::File>,
    diag: csv::Writer<std::fs::File>,
}

impl ArtifactWriter {
    /// Create `dir` (if needed), the stream files, and the meta record.
    pub fn create(dir: &Path, meta: &ScenarioConfig) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let mut meta_writer = open(dir, META_FILE)?;
        meta_writer.serialize(meta)?;
        meta_writer.flush()?;

        Ok(Self {
            dir: dir.to_path_buf(),
            truth: open(dir, TRUTH_FILE)?,
            meas: open(dir, MEAS_FILE)?,
            est: open(dir, EST_FILE)?,
            diag: open(dir, DIAG_FILE)?,
        })
    }

    pub fn write_step(
        &mut self,
        truth: &StateRow,
        meas: &MeasRow,
        est: &StateRow,
        diag: &DiagRow,
    ) -> Result<()> {
        self.truth.serialize(truth)?;
        self.meas.serialize(meas)?;
        self.est.serialize(est)?;
        self.diag.serialize(diag)?;
        Ok(())
    }

    /// Flush all streams and return the artifact directory.
    pub fn finish(mut self) -> Result<PathBuf> {
        self.truth.flush()?;
        self.meas.flush()?;
        self.est.flush()?;
        self.diag.flush()?;
        Ok(self.dir)
    }
}

fn open(dir: &Path, name: &str) -> Result<csv::Writer<std::fs::File>> {
    let path = dir.join(name);
    csv::Writer::from_path(&path).with_context(|| format!("failed to create {}", path.display()))
}
