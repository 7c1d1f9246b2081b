//! Duplicate removal and missing-value resolution

use super::imputer::{ImputeStrategy, Imputer};
use super::is_numeric_dtype;
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// What a cleaning pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Rows dropped as exact duplicates of an earlier row
    pub duplicates_removed: usize,
    /// Number of cells filled per column
    pub filled: BTreeMap<String, usize>,
    /// Columns left with missing values because nothing was observed
    pub unresolved_columns: Vec<String>,
}

impl CleaningReport {
    /// Total number of imputed cells
    pub fn total_filled(&self) -> usize {
        self.filled.values().sum()
    }
}

/// Remove rows that exactly repeat an earlier row, keeping first occurrences in order.
///
/// Missing cells compare equal to each other.
pub fn drop_duplicates(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

/// Clean a dataset: drop exact duplicates, impute numeric columns with
/// their mean and non-numeric columns with their mode, then drop any rows
/// the filling made identical.
pub fn clean(df: &DataFrame) -> Result<DataFrame> {
    clean_with_report(df).map(|(cleaned, _)| cleaned)
}

/// Like [`clean`], also returning what was changed
pub fn clean_with_report(df: &DataFrame) -> Result<(DataFrame, CleaningReport)> {
    let mut report = CleaningReport::default();

    let deduped = drop_duplicates(df)?;
    report.duplicates_removed = df.height() - deduped.height();
    debug!(removed = report.duplicates_removed, "Duplicate rows dropped");

    let mut numeric_cols = Vec::new();
    let mut other_cols = Vec::new();
    for col in deduped.get_columns() {
        if col.null_count() == 0 {
            continue;
        }
        if is_numeric_dtype(col.dtype()) {
            numeric_cols.push(col.name().to_string());
        } else {
            other_cols.push(col.name().to_string());
        }
        report.filled.insert(col.name().to_string(), col.null_count());
    }

    let numeric_refs: Vec<&str> = numeric_cols.iter().map(String::as_str).collect();
    let other_refs: Vec<&str> = other_cols.iter().map(String::as_str).collect();

    let mut mean_imputer = Imputer::new(ImputeStrategy::Mean);
    let with_means = mean_imputer.fit_transform(&deduped, &numeric_refs)?;

    let mut mode_imputer = Imputer::new(ImputeStrategy::MostFrequent);
    let imputed = mode_imputer.fit_transform(&with_means, &other_refs)?;

    // Filling can make distinct rows identical
    let cleaned = drop_duplicates(&imputed)?;
    let merged = imputed.height() - cleaned.height();
    if merged > 0 {
        debug!(removed = merged, "Rows made identical by imputation dropped");
        report.duplicates_removed += merged;
    }

    for name in mean_imputer
        .unresolved_columns()
        .iter()
        .chain(mode_imputer.unresolved_columns())
    {
        warn!(column = %name, "Column has no observed values; missing markers left unresolved");
        report.filled.remove(name);
        report.unresolved_columns.push(name.clone());
    }

    info!(
        rows = cleaned.height(),
        duplicates_removed = report.duplicates_removed,
        cells_filled = report.total_filled(),
        "Data cleaning completed"
    );

    Ok((cleaned, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_duplicates_keeps_first_in_order() {
        let df = df!(
            "a" => &[1i64, 2, 1, 3, 2],
            "b" => &["x", "y", "x", "z", "q"]
        )
        .unwrap();

        let out = drop_duplicates(&df).unwrap();
        assert_eq!(out.height(), 4);
        let a: Vec<Option<i64>> = out.column("a").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), Some(2), Some(3), Some(2)]);
    }

    #[test]
    fn test_drop_duplicates_treats_nulls_as_equal() {
        let df = df!("a" => &[None, Some(1.0), None]).unwrap();
        let out = drop_duplicates(&df).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_drop_duplicates_signed_zero() {
        let df = df!("a" => &[0.0, -0.0, 1.0]).unwrap();
        assert_eq!(drop_duplicates(&df).unwrap().height(), 2);
    }

    #[test]
    fn test_imputation_created_duplicates_are_dropped() {
        let df = df!("x" => &[Some(1.0), None], "c" => &["a", "a"]).unwrap();
        let (cleaned, report) = clean_with_report(&df).unwrap();
        assert_eq!(cleaned.height(), 1);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.filled.get("x"), Some(&1));
    }

    #[test]
    fn test_clean_report_counts() {
        let df = df!(
            "n" => &[Some(1.0), None, Some(3.0), Some(1.0)],
            "c" => &[Some("a"), Some("a"), None, Some("a")]
        )
        .unwrap();

        let (cleaned, report) = clean_with_report(&df).unwrap();
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.filled.get("n"), Some(&1));
        assert_eq!(report.filled.get("c"), Some(&1));
        assert_eq!(report.total_filled(), 2);
        assert!(report.unresolved_columns.is_empty());
        assert_eq!(cleaned.height(), 3);
    }

    #[test]
    fn test_clean_leaves_columns_without_nulls_untouched() {
        let df = df!("n" => &[1i64, 2, 3]).unwrap();
        let cleaned = clean(&df).unwrap();
        assert_eq!(cleaned.column("n").unwrap().dtype(), &DataType::Int64);
        assert!(cleaned.equals(&df));
    }

    #[test]
    fn test_clean_reports_all_missing_column() {
        let df = df!(
            "n" => &[Some(1.0), Some(2.0)],
            "empty" => &[None::<f64>, None]
        )
        .unwrap();

        let (cleaned, report) = clean_with_report(&df).unwrap();
        assert_eq!(report.unresolved_columns, vec!["empty".to_string()]);
        assert!(report.filled.is_empty());
        assert_eq!(cleaned.column("empty").unwrap().null_count(), 2);
    }
}
