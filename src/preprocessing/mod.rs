//! Data preprocessing module
//!
//! Provides the loading-side transformations of the pipeline:
//! - Exact-duplicate row removal
//! - Missing value imputation (mean for numeric, mode for categorical)
//! - Label encoding of non-numeric columns
//! - Descriptive summaries
//! - Row filters used by interactive front-ends

mod cleaner;
mod encoder;
mod filters;
mod imputer;
mod summary;

pub use cleaner::{clean, clean_with_report, drop_duplicates, CleaningReport};
pub use encoder::{encode, LabelEncoder};
pub use filters::{date_bounds, filter_date_range, filter_equals, parse_date, target_candidates};
pub use imputer::{ImputeStrategy, Imputer};
pub use summary::{summarize, ColumnSummary, Summary};

use crate::error::{Result, TabflowError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column data type as seen by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
    Boolean,
    Unknown,
}

impl ColumnType {
    /// Classify a declared polars dtype
    pub fn of(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnType::Numeric
        } else {
            match dtype {
                DataType::String => ColumnType::Categorical,
                DataType::Boolean => ColumnType::Boolean,
                DataType::Null => ColumnType::Unknown,
                _ => ColumnType::Categorical,
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Numeric)
    }
}

/// Check if dtype is numeric
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Look up a column's type by name
pub fn column_type(df: &DataFrame, column: &str) -> Result<ColumnType> {
    let col = df
        .column(column)
        .map_err(|_| TabflowError::FeatureNotFound(column.to_string()))?;
    Ok(ColumnType::of(col.dtype()))
}

/// Extract a column as `f64` values, keeping nulls as `None`
pub(crate) fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Extract a column as text values, keeping nulls as `None`
pub(crate) fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}
