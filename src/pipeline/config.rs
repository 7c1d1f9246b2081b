//! Pipeline configuration

use crate::error::{Result, TabflowError};
use crate::training::TrainingConfig;
use crate::visualization::{ChartKind, RenderConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inclusive date window applied to the date column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Keep only rows where `column` equals `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub column: String,
    pub value: String,
}

/// Configuration for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV
    pub data_path: PathBuf,
    /// Column to predict; training is skipped when unset
    pub target_column: Option<String>,
    pub date_column: Option<String>,
    /// Requires `date_column`
    pub date_range: Option<DateRange>,
    pub category_filter: Option<CategoryFilter>,
    /// Columns to chart; empty means the first numeric column
    pub plot_columns: Vec<String>,
    pub plot_kind: ChartKind,
    pub output_dir: PathBuf,
    pub random_seed: Option<u64>,
    pub test_size: f64,
    pub n_estimators: usize,
    pub chart_width: u32,
    pub chart_height: u32,
    pub comparison_preview: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/sales.csv"),
            target_column: None,
            date_column: None,
            date_range: None,
            category_filter: None,
            plot_columns: Vec::new(),
            plot_kind: ChartKind::Auto,
            output_dir: PathBuf::from("charts"),
            random_seed: None,
            test_size: 0.2,
            n_estimators: 100,
            chart_width: 800,
            chart_height: 500,
            comparison_preview: 50,
        }
    }
}

impl PipelineConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = Some(target.into());
        self
    }

    pub fn with_date_range(
        mut self,
        date_column: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        self.date_column = Some(date_column.into());
        self.date_range = Some(DateRange { start, end });
        self
    }

    pub fn with_category_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.category_filter = Some(CategoryFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_plot_column(mut self, column: impl Into<String>) -> Self {
        self.plot_columns.push(column.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(TabflowError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.n_estimators == 0 {
            return Err(TabflowError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if let Some(range) = &self.date_range {
            if self.date_column.is_none() {
                return Err(TabflowError::ConfigError(
                    "date_range requires date_column".to_string(),
                ));
            }
            if range.start > range.end {
                return Err(TabflowError::ConfigError(format!(
                    "date range start {} is after end {}",
                    range.start, range.end
                )));
            }
        }
        Ok(())
    }

    /// Training settings for the configured target
    pub fn training_config(&self, target: &str) -> TrainingConfig {
        let mut config = TrainingConfig::new(target)
            .with_test_size(self.test_size)
            .with_n_estimators(self.n_estimators);
        config.random_seed = self.random_seed;
        config
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig::new(&self.output_dir)
            .with_size(self.chart_width, self.chart_height)
            .with_comparison_preview(self.comparison_preview)
    }

    /// Save the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TabflowError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| TabflowError::ConfigError(format!("invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.data_path, PathBuf::from("data/sales.csv"));
        assert!(config.target_column.is_none());
        assert_eq!(config.comparison_preview, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"target_column": "revenue", "random_seed": 9}"#).unwrap();
        assert_eq!(config.target_column.as_deref(), Some("revenue"));
        assert_eq!(config.random_seed, Some(9));
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.plot_kind, ChartKind::Auto);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        let config = PipelineConfig::new("in.csv")
            .with_target("units")
            .with_date_range("order_date", start, end)
            .with_plot_column("units");
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.target_column.as_deref(), Some("units"));
        assert_eq!(loaded.date_range, Some(DateRange { start, end }));
        assert_eq!(loaded.plot_columns, vec!["units"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.test_size = 1.5;
        assert!(matches!(config.validate(), Err(TabflowError::ConfigError(_))));

        let mut config = PipelineConfig::default();
        config.date_range = Some(DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(TabflowError::ConfigError(_))
        ));
    }

    #[test]
    fn test_derived_configs() {
        let config = PipelineConfig::default().with_random_seed(4).with_output_dir("out");
        let training = config.training_config("y");
        assert_eq!(training.target_column, "y");
        assert_eq!(training.random_seed, Some(4));
        let render = config.render_config();
        assert_eq!(render.output_dir, PathBuf::from("out"));
        assert_eq!((render.width, render.height), (800, 500));
    }
}
