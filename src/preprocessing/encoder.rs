//! Label encoding for non-numeric columns

use super::{is_numeric_dtype, text_values};
use crate::error::{Result, TabflowError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Maps each distinct value of a non-numeric column to an integer code.
///
/// Codes follow the ascending order of the values, starting at zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    // column name -> sorted classes; a class's code is its index
    classes: BTreeMap<String, Vec<String>>,
    is_fitted: bool,
}

impl LabelEncoder {
    /// Create a new, unfitted encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the classes of every non-numeric column in the frame
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.classes.clear();

        for col in df.get_columns() {
            if is_numeric_dtype(col.dtype()) {
                continue;
            }
            let distinct: BTreeSet<String> = text_values(col.as_materialized_series())?
                .into_iter()
                .flatten()
                .collect();
            self.classes
                .insert(col.name().to_string(), distinct.into_iter().collect());
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace every encoded column with its `Float64` codes
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(TabflowError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (name, classes) in &self.classes {
            let Ok(col) = df.column(name) else {
                continue;
            };
            let codes = text_values(col.as_materialized_series())?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value {
                    Some(v) => classes
                        .binary_search(&v)
                        .map(|code| code as f64)
                        .map_err(|_| {
                            TabflowError::DataError(format!(
                                "unseen value '{}' in column '{}'",
                                v, name
                            ))
                        }),
                    None => Err(TabflowError::DataError(format!(
                        "missing value at row {} in column '{}'",
                        row, name
                    ))),
                })
                .collect::<Result<Vec<f64>>>()?;

            result.with_column(Series::new(name.as_str().into(), codes))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Map codes of one column back to the original values
    pub fn inverse_transform_column(&self, column: &str, codes: &[f64]) -> Result<Vec<String>> {
        let classes = self
            .classes
            .get(column)
            .ok_or_else(|| TabflowError::FeatureNotFound(column.to_string()))?;

        codes
            .iter()
            .map(|&code| {
                let idx = code.round();
                if idx < 0.0 || idx as usize >= classes.len() {
                    Err(TabflowError::DataError(format!(
                        "code {} out of range for column '{}'",
                        code, column
                    )))
                } else {
                    Ok(classes[idx as usize].clone())
                }
            })
            .collect()
    }

    /// Whether a column was label-encoded
    pub fn is_encoded(&self, column: &str) -> bool {
        self.classes.contains_key(column)
    }

    /// Classes learned for a column, in code order
    pub fn classes(&self, column: &str) -> Option<&[String]> {
        self.classes.get(column).map(Vec::as_slice)
    }

    /// Names of the encoded columns
    pub fn encoded_columns(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

/// Label-encode every non-numeric column with a freshly built mapping.
///
/// Codes are only meaningful within this call's output.
pub fn encode(df: &DataFrame) -> Result<DataFrame> {
    LabelEncoder::new().fit_transform(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "size" => &[1.0, 2.0, 3.0, 4.0],
            "color" => &["red", "blue", "red", "green"],
            "label" => &["yes", "no", "no", "yes"]
        )
        .unwrap()
    }

    #[test]
    fn test_encode_assigns_sorted_codes() {
        let encoded = encode(&sample()).unwrap();

        let color: Vec<Option<f64>> = encoded.column("color").unwrap().f64().unwrap().into_iter().collect();
        // blue=0, green=1, red=2
        assert_eq!(color, vec![Some(2.0), Some(0.0), Some(2.0), Some(1.0)]);

        let label: Vec<Option<f64>> = encoded.column("label").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(label, vec![Some(1.0), Some(0.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_numeric_columns_untouched() {
        let df = sample();
        let encoded = encode(&df).unwrap();
        let before = df.column("size").unwrap().as_materialized_series();
        let after = encoded.column("size").unwrap().as_materialized_series();
        assert!(after.equals(before));
    }

    #[test]
    fn test_inverse_transform() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&sample()).unwrap();

        let decoded = encoder.inverse_transform_column("color", &[0.0, 2.0, 1.0]).unwrap();
        assert_eq!(decoded, vec!["blue", "red", "green"]);
        assert!(encoder.inverse_transform_column("color", &[7.0]).is_err());
        assert!(encoder.inverse_transform_column("size", &[0.0]).is_err());
    }

    #[test]
    fn test_unseen_value_fails() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&sample()).unwrap();

        let other = df!(
            "size" => &[1.0],
            "color" => &["purple"],
            "label" => &["yes"]
        )
        .unwrap();
        assert!(encoder.transform(&other).is_err());
    }

    #[test]
    fn test_missing_value_fails() {
        let df = df!("c" => &[Some("a"), None]).unwrap();
        assert!(encode(&df).is_err());
    }

    #[test]
    fn test_encoder_metadata() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&sample()).unwrap();

        assert!(encoder.is_encoded("color"));
        assert!(!encoder.is_encoded("size"));
        assert_eq!(
            encoder.classes("label").unwrap(),
            &["no".to_string(), "yes".to_string()]
        );
        assert_eq!(encoder.encoded_columns().count(), 2);
    }
}
