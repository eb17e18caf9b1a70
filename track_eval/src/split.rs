//! Group-wise train/validation/test partitioning.
//!
//! Rows of one `(scenario, seed)` run always land in the same split, so no
//! trajectory leaks between training and evaluation.

use crate::dataset::{Dataset, DatasetRow};
use crate::error::{EvalError, Result};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub const TRAIN_FILE: &str = "train.csv";
pub const VAL_FILE: &str = "val.csv";
pub const TEST_FILE: &str = "test.csv";
pub const SUMMARY_FILE: &str = "dataset_summary.txt";

pub const TRAIN_FRACTION: f64 = 0.70;
pub const VAL_FRACTION: f64 = 0.15;

/// Fewest groups that can fill all three splits.
pub const MIN_GROUPS: usize = 3;

/// Identity of one run. Ordered by scenario name, then seed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub scenario: String,
    pub seed: u64,
}

impl GroupKey {
    pub fn of(row: &DatasetRow) -> Self {
        Self {
            scenario: row.scenario.clone(),
            seed: row.seed,
        }
    }
}

/// Number of groups in each split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

impl SplitSizes {
    /// 70 / 15 / remainder, each at least one group.
    pub fn for_groups(n: usize) -> Result<Self> {
        if n < MIN_GROUPS {
            return Err(EvalError::Split { groups: n });
        }
        let share = |frac: f64| ((n as f64 * frac).round_ties_even() as usize).max(1);
        let mut train = share(TRAIN_FRACTION);
        let mut val = share(VAL_FRACTION);
        while train + val > n - 1 {
            if train >= val && train > 1 {
                train -= 1;
            } else {
                val -= 1;
            }
        }
        Ok(Self {
            train,
            val,
            test: n - train - val,
        })
    }
}

/// The three row subsets plus the groups each was built from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Split {
    pub train: Vec<DatasetRow>,
    pub val: Vec<DatasetRow>,
    pub test: Vec<DatasetRow>,
    pub train_groups: Vec<GroupKey>,
    pub val_groups: Vec<GroupKey>,
    pub test_groups: Vec<GroupKey>,
}

impl Split {
    pub fn groups_total(&self) -> usize {
        self.train_groups.len() + self.val_groups.len() + self.test_groups.len()
    }

    /// `key=value` summary lines.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (key, value) in [
            ("groups_total", self.groups_total()),
            ("groups_train", self.train_groups.len()),
            ("groups_val", self.val_groups.len()),
            ("groups_test", self.test_groups.len()),
            ("rows_train", self.train.len()),
            ("rows_val", self.val.len()),
            ("rows_test", self.test.len()),
        ] {
            let _ = writeln!(out, "{key}={value}");
        }
        out
    }

    /// Write the three split CSVs and the summary into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| EvalError::io(dir, e))?;
        for (name, rows) in [
            (TRAIN_FILE, &self.train),
            (VAL_FILE, &self.val),
            (TEST_FILE, &self.test),
        ] {
            write_rows(&dir.join(name), rows)?;
        }
        let summary = dir.join(SUMMARY_FILE);
        std::fs::write(&summary, self.summary()).map_err(|e| EvalError::io(&summary, e))?;
        info!(
            dir = %dir.display(),
            train = self.train.len(),
            val = self.val.len(),
            test = self.test.len(),
            "wrote dataset splits"
        );
        Ok(())
    }
}

fn write_rows(path: &Path, rows: &[DatasetRow]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush().map_err(|e| EvalError::io(path, e))?;
    Ok(())
}

/// Partition `dataset` by whole `(scenario, seed)` groups into contiguous
/// ranges of the sorted group list. Row order within each split follows the
/// dataset.
pub fn partition(dataset: &Dataset) -> Result<Split> {
    let groups: Vec<GroupKey> = dataset
        .rows
        .iter()
        .map(GroupKey::of)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let sizes = SplitSizes::for_groups(groups.len())?;

    let (train_groups, rest) = groups.split_at(sizes.train);
    let (val_groups, test_groups) = rest.split_at(sizes.val);

    let mut split = Split {
        train_groups: train_groups.to_vec(),
        val_groups: val_groups.to_vec(),
        test_groups: test_groups.to_vec(),
        ..Default::default()
    };
    let train_set: BTreeSet<_> = split.train_groups.iter().collect();
    let val_set: BTreeSet<_> = split.val_groups.iter().collect();
    for row in &dataset.rows {
        let key = GroupKey::of(row);
        if train_set.contains(&key) {
            split.train.push(row.clone());
        } else if val_set.contains(&key) {
            split.val.push(row.clone());
        } else {
            split.test.push(row.clone());
        }
    }
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(scenario: &str, seed: u64, k: u32) -> DatasetRow {
        DatasetRow {
            k,
            x_truth: 0.0,
            y_truth: 0.0,
            vx_truth: 1.0,
            vy_truth: 0.5,
            zx: None,
            zy: None,
            valid: 0,
            x_est: 0.0,
            y_est: 0.0,
            vx_est: 0.0,
            vy_est: 0.0,
            yx: 0.0,
            yy: 0.0,
            sx: 4.0,
            sy: 4.0,
            nis: 0.0,
            q: 1.0,
            r: 4.0,
            scenario: scenario.into(),
            dt: 0.02,
            seed,
            steps: 2,
            sigma_z: 2.0,
            p_detect: 1.0,
            clutter_prob: 0.0,
            clutter_range: 80.0,
            speed: 1.0,
            q_true: 1.5,
            r_true: 4.0,
        }
    }

    fn dataset(groups: &[(&str, u64)], rows_per_group: u32) -> Dataset {
        groups
            .iter()
            .flat_map(|&(s, seed)| (0..rows_per_group).map(move |k| row(s, seed, k)))
            .collect()
    }

    #[test]
    fn fewer_than_three_groups_is_an_error() {
        for groups in [&[][..], &[("cv", 1)][..], &[("cv", 1), ("cv", 2)][..]] {
            let err = partition(&dataset(groups, 3)).unwrap_err();
            assert!(matches!(err, EvalError::Split { groups: n } if n == groups.len()));
        }
    }

    #[test]
    fn three_groups_fill_every_split() {
        let s = SplitSizes::for_groups(3).unwrap();
        assert_eq!((s.train, s.val, s.test), (1, 1, 1));
    }

    #[test]
    fn standard_sizes() {
        let s = SplitSizes::for_groups(48).unwrap();
        // 33.6 -> 34, 7.2 -> 7
        assert_eq!((s.train, s.val, s.test), (34, 7, 7));
        let s = SplitSizes::for_groups(10).unwrap();
        // 1.5 rounds to even
        assert_eq!((s.train, s.val, s.test), (7, 2, 1));
        let s = SplitSizes::for_groups(4).unwrap();
        assert_eq!((s.train, s.val, s.test), (2, 1, 1));
    }

    #[test]
    fn groups_sorted_by_scenario_then_seed() {
        let ds = dataset(
            &[("maneuver", 5), ("cv", 20), ("cv", 3), ("clutter", 9)],
            2,
        );
        let split = partition(&ds).unwrap();
        let order: Vec<_> = split
            .train_groups
            .iter()
            .chain(&split.val_groups)
            .chain(&split.test_groups)
            .map(|g| (g.scenario.as_str(), g.seed))
            .collect();
        assert_eq!(
            order,
            [("clutter", 9), ("cv", 3), ("cv", 20), ("maneuver", 5)]
        );
    }

    #[test]
    fn summary_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let ds = dataset(&[("cv", 1), ("cv", 2), ("cv", 3)], 4);
        let split = partition(&ds).unwrap();
        split.write(dir.path()).unwrap();

        let summary = std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("groups_total=3\n"));
        assert!(summary.contains("rows_test=4\n"));
        for name in [TRAIN_FILE, VAL_FILE, TEST_FILE] {
            let mut r = csv::Reader::from_path(dir.path().join(name)).unwrap();
            let rows: Vec<DatasetRow> = r.deserialize().collect::<std::result::Result<_, _>>().unwrap();
            assert_eq!(rows.len(), 4);
        }
    }

    proptest! {
        /// Every group lands in exactly one split and every row is kept
        #[test]
        fn prop_split_is_disjoint_and_complete(
            seeds in prop::collection::btree_set(0u64..500, 3..40),
            rows_per_group in 1u32..4,
        ) {
            let groups: Vec<(&str, u64)> = seeds
                .iter()
                .enumerate()
                .map(|(i, &s)| (if i % 2 == 0 { "cv" } else { "clutter" }, s))
                .collect();
            let ds = dataset(&groups, rows_per_group);
            let split = partition(&ds).unwrap();

            let train: BTreeSet<_> = split.train.iter().map(GroupKey::of).collect();
            let val: BTreeSet<_> = split.val.iter().map(GroupKey::of).collect();
            let test: BTreeSet<_> = split.test.iter().map(GroupKey::of).collect();
            prop_assert!(train.is_disjoint(&val));
            prop_assert!(train.is_disjoint(&test));
            prop_assert!(val.is_disjoint(&test));
            prop_assert!(!train.is_empty() && !val.is_empty() && !test.is_empty());
            prop_assert_eq!(
                split.train.len() + split.val.len() + split.test.len(),
                ds.len()
            );
            prop_assert_eq!(split.groups_total(), groups.len());
        }
    }
}
