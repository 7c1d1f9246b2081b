//! Missing value imputation strategies

use super::{is_numeric_dtype, text_values};
use crate::error::{Result, TabflowError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with the most frequent value; ties go to the value seen first
    MostFrequent,
}

#[derive(Debug, Clone)]
enum ImputeValue {
    /// Column mean; the filled column becomes `Float64`
    Mean(f64),
    /// Single-row series holding the mode in the column's own dtype
    Mode(Series),
}

/// Imputer for handling missing values
#[derive(Debug, Clone)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, ImputeValue>,
    /// Columns with no observed value to derive a fill from
    unresolved: Vec<String>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            unresolved: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the imputer to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        self.fill_values.clear();
        self.unresolved.clear();

        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| TabflowError::FeatureNotFound(col_name.to_string()))?;

            match self.compute_fill_value(column.as_materialized_series())? {
                Some(value) => {
                    self.fill_values.insert(col_name.to_string(), value);
                }
                None => self.unresolved.push(col_name.to_string()),
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data by imputing missing values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(TabflowError::ModelNotFitted);
        }

        let mut result = df.clone();

        for (col_name, fill_value) in &self.fill_values {
            if let Ok(col) = df.column(col_name) {
                if col.null_count() == 0 {
                    continue;
                }
                let filled = Self::fill_series(col.as_materialized_series(), fill_value)?;
                result.with_column(filled)?;
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Columns that could not be resolved because every value was missing
    pub fn unresolved_columns(&self) -> &[String] {
        &self.unresolved
    }

    fn compute_fill_value(&self, series: &Series) -> Result<Option<ImputeValue>> {
        if series.null_count() == series.len() {
            return Ok(None);
        }

        match &self.strategy {
            ImputeStrategy::Mean => {
                if !is_numeric_dtype(series.dtype()) {
                    return Err(TabflowError::DataError(format!(
                        "mean imputation needs a numeric column, '{}' is {}",
                        series.name(),
                        series.dtype()
                    )));
                }
                let cast = series.cast(&DataType::Float64)?;
                Ok(cast.f64()?.mean().map(ImputeValue::Mean))
            }
            ImputeStrategy::MostFrequent => {
                // Rank by text form so every dtype shares one tie rule
                let keys = text_values(series)?;
                let Some((mode, _)) = most_frequent(keys.iter().flatten()) else {
                    return Ok(None);
                };
                let position = keys
                    .iter()
                    .position(|k| k.as_ref() == Some(mode))
                    .ok_or_else(|| TabflowError::ComputationError("mode not found".to_string()))?;
                Ok(Some(ImputeValue::Mode(series.slice(position as i64, 1))))
            }
        }
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        let filled = match fill_value {
            ImputeValue::Mean(val) => {
                let cast = series.cast(&DataType::Float64)?;
                let filled: Float64Chunked = cast
                    .f64()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();
                filled.with_name(series.name().clone()).into_series()
            }
            ImputeValue::Mode(mode) => {
                let fill = mode.cast(series.dtype())?.new_from_index(0, series.len());
                series.zip_with(&series.is_not_null(), &fill)?
            }
        };
        Ok(filled)
    }
}

/// Most frequent value and its count. Ties resolve to the value encountered first.
pub(crate) fn most_frequent<T, I>(values: I) -> Option<(T, usize)>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (position, value) in values.into_iter().enumerate() {
        counts
            .entry(value)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, (count, _))| (value, count))
}
