//! Descriptive statistics for a dataset

use super::{text_values, ColumnType};
use super::imputer::most_frequent;
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-column descriptive statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: ColumnType,
    /// Non-missing values
    pub count: usize,
    pub null_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(rename = "25%", skip_serializing_if = "Option::is_none")]
    pub q25: Option<f64>,
    #[serde(rename = "50%", skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(rename = "75%", skip_serializing_if = "Option::is_none")]
    pub q75: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Distinct non-missing values (non-numeric columns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<usize>,
    /// Most frequent value (non-numeric columns)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
    /// Count of the most frequent value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<usize>,
}

impl ColumnSummary {
    fn new(name: &str, dtype: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            dtype,
            count: 0,
            null_count: 0,
            mean: None,
            std: None,
            min: None,
            q25: None,
            median: None,
            q75: None,
            max: None,
            unique: None,
            top: None,
            freq: None,
        }
    }

    fn from_series(series: &Series) -> Result<Self> {
        let dtype = ColumnType::of(series.dtype());
        let mut stats = Self::new(series.name().as_str(), dtype);
        stats.null_count = series.null_count();
        stats.count = series.len() - stats.null_count;

        if dtype.is_numeric() {
            if stats.count == 0 {
                return Ok(stats);
            }
            let cast = series.cast(&DataType::Float64)?;
            let ca = cast.f64()?;

            stats.mean = ca.mean();
            stats.std = if stats.count > 1 { ca.std(1) } else { None };
            stats.min = ca.min();
            stats.max = ca.max();
            stats.q25 = ca.quantile(0.25, QuantileMethod::Linear)?;
            stats.median = ca.median();
            stats.q75 = ca.quantile(0.75, QuantileMethod::Linear)?;
        } else {
            stats.unique = Some(series.drop_nulls().n_unique()?);
            if let Some((top, freq)) = most_frequent(text_values(series)?.into_iter().flatten()) {
                stats.top = Some(top);
                stats.freq = Some(freq);
            }
        }

        Ok(stats)
    }
}

/// Dataset-level summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub row_count: usize,
    pub column_count: usize,
    pub column_names: Vec<String>,
    pub columns: Vec<ColumnSummary>,
}

impl Summary {
    /// Statistics for one column
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Statistics for numeric columns only
    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnSummary> {
        self.columns.iter().filter(|c| c.dtype.is_numeric())
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Summarize a dataset without modifying it
pub fn summarize(df: &DataFrame) -> Result<Summary> {
    let columns = df
        .get_columns()
        .iter()
        .map(|c| ColumnSummary::from_series(c.as_materialized_series()))
        .collect::<Result<Vec<_>>>()?;

    Ok(Summary {
        row_count: df.height(),
        column_count: df.width(),
        column_names: df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
        columns,
    })
}
