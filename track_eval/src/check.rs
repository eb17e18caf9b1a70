//! Sanity check of a materialised dataset directory.

use crate::error::{EvalError, Result};
use crate::split::{TEST_FILE, TRAIN_FILE, VAL_FILE};
use std::fmt;
use std::path::Path;

/// How many leading column names a report shows.
const PREVIEW_COLUMNS: usize = 8;

/// Shape of one split file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitFileInfo {
    pub name: &'static str,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Result of checking a dataset directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetCheck {
    pub files: Vec<SplitFileInfo>,
}

impl fmt::Display for DatasetCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for info in &self.files {
            let shown = info.columns.len().min(PREVIEW_COLUMNS);
            writeln!(
                f,
                "{}: rows={} cols={} [{}{}]",
                info.name,
                info.rows,
                info.columns.len(),
                info.columns[..shown].join(", "),
                if info.columns.len() > shown { ", ..." } else { "" }
            )?;
        }
        write!(f, "dataset OK")
    }
}

/// Verify `dir` holds all three split files with a header, and count rows.
pub fn check_dataset(dir: &Path) -> Result<DatasetCheck> {
    let mut files = Vec::with_capacity(3);
    for name in [TRAIN_FILE, VAL_FILE, TEST_FILE] {
        let path = dir.join(name);
        if !path.is_file() {
            return Err(EvalError::schema(&path, "split file missing"));
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.is_empty() {
            return Err(EvalError::schema(&path, "no header row"));
        }
        let mut rows = 0;
        for record in reader.records() {
            record?;
            rows += 1;
        }
        files.push(SplitFileInfo {
            name,
            rows,
            columns,
        });
    }
    Ok(DatasetCheck { files })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_rows_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            (TRAIN_FILE, "k,a\n0,1\n1,2\n"),
            (VAL_FILE, "k,a\n0,1\n"),
            (TEST_FILE, "k,a\n"),
        ] {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let check = check_dataset(dir.path()).unwrap();
        let rows: Vec<_> = check.files.iter().map(|f| f.rows).collect();
        assert_eq!(rows, [2, 1, 0]);
        let text = check.to_string();
        assert!(text.contains("train.csv: rows=2 cols=2 [k, a]"));
        assert!(text.ends_with("dataset OK"));
    }

    #[test]
    fn missing_split_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TRAIN_FILE), "k\n0\n").unwrap();
        let err = check_dataset(dir.path()).unwrap_err();
        assert!(err.to_string().contains("val.csv"));
    }
}
