//! Error types for the evaluation pipeline.
//!
//! Every variant is fatal: the pipeline stops at the first error and the
//! caller exits non-zero. Nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Error, Debug)]
pub enum EvalError {
    /// The estimator binary could not be located
    #[error("estimator executable not found (looked in: {})\nBuild it first: cargo build --release -p cli --bin let_track", format_paths(.searched))]
    ExecutableNotFound { searched: Vec<PathBuf> },

    /// The estimator exited non-zero
    #[error("estimator run failed ({status}): {command}\n{output}")]
    RunFailure {
        command: String,
        status: String,
        output: String,
    },

    /// An artifact column is missing, malformed, or the streams do not line up
    #[error("schema error in {}: {detail}", .file.display())]
    Schema { file: PathBuf, detail: String },

    /// Too few (scenario, seed) groups to fill train/val/test
    #[error("need at least 3 (scenario, seed) groups for a train/val/test split, found {groups}")]
    Split { groups: usize },

    /// A run configuration violates its invariants
    #[error("invalid scenario config '{scenario}': {source}")]
    InvalidConfig {
        scenario: String,
        #[source]
        source: sim::ConfigError,
    },

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A chart could not be drawn or written
    #[error("chart rendering failed at {}: {detail}", .path.display())]
    Plot { path: PathBuf, detail: String },
}

impl EvalError {
    pub fn schema(file: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        EvalError::Schema {
            file: file.into(),
            detail: detail.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let err = EvalError::Split { groups: 2 };
        assert!(err.to_string().contains("found 2"));

        let err = EvalError::schema("run/est.csv", "missing step k=4");
        assert_eq!(err.to_string(), "schema error in run/est.csv: missing step k=4");

        let err = EvalError::ExecutableNotFound {
            searched: vec![PathBuf::from("a/let_track"), PathBuf::from("b/let_track")],
        };
        assert!(err.to_string().contains("a/let_track, b/let_track"));
    }
}
