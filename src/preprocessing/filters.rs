//! Row filters and column pickers for interactive front-ends

use super::text_values;
use crate::error::{Result, TabflowError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a cell as a calendar date. Unrecognized text yields `None`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

fn parsed_dates(df: &DataFrame, date_column: &str) -> Result<Vec<Option<NaiveDate>>> {
    let col = df
        .column(date_column)
        .map_err(|_| TabflowError::FeatureNotFound(date_column.to_string()))?;
    Ok(text_values(col.as_materialized_series())?
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_date))
        .collect())
}

/// Earliest and latest parseable dates in a column
pub fn date_bounds(df: &DataFrame, date_column: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let dates: Vec<NaiveDate> = parsed_dates(df, date_column)?.into_iter().flatten().collect();
    Ok(dates
        .iter()
        .min()
        .copied()
        .zip(dates.iter().max().copied()))
}

/// Keep rows whose date lies in `[start, end]`; unparseable dates are dropped
pub fn filter_date_range(
    df: &DataFrame,
    date_column: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DataFrame> {
    if start > end {
        return Err(TabflowError::ConfigError(format!(
            "date range start {} is after end {}",
            start, end
        )));
    }
    let keep: Vec<bool> = parsed_dates(df, date_column)?
        .into_iter()
        .map(|d| d.map_or(false, |d| d >= start && d <= end))
        .collect();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Keep rows whose value in `column` equals `value`
pub fn filter_equals(df: &DataFrame, column: &str, value: &str) -> Result<DataFrame> {
    let col = df
        .column(column)
        .map_err(|_| TabflowError::FeatureNotFound(column.to_string()))?;
    let keep: Vec<bool> = text_values(col.as_materialized_series())?
        .into_iter()
        .map(|v| v.as_deref() == Some(value))
        .collect();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Columns with more than one distinct non-missing value, in original order
pub fn target_candidates(df: &DataFrame) -> Result<Vec<String>> {
    let mut candidates = Vec::new();
    for col in df.get_columns() {
        let distinct: HashSet<String> = text_values(col.as_materialized_series())?
            .into_iter()
            .flatten()
            .collect();
        if distinct.len() > 1 {
            candidates.push(col.name().to_string());
        }
    }
    Ok(candidates)
}
