//! Batch pipeline: load, clean, summarize, train and chart in one pass.
//!
//! A load failure stops the run. Training and chart failures are recorded in
//! the [`PipelineOutcome`] and the remaining stages still run.

mod config;

pub use config::{CategoryFilter, DateRange, PipelineConfig};

use crate::error::{Result, TabflowError};
use crate::preprocessing::{
    clean_with_report, filter_date_range, filter_equals, is_numeric_dtype, summarize,
    CleaningReport, Summary,
};
use crate::training::{TrainEngine, TrainResult};
use crate::utils::DataLoader;
use crate::visualization::ChartRenderer;
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of one optional stage
#[derive(Debug)]
pub enum Stage<T> {
    Completed(T),
    Skipped(String),
    Failed(TabflowError),
}

impl<T> Stage<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            Stage::Completed(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Stage::Failed(_))
    }

    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(v) => Stage::Completed(v),
            Err(e) => Stage::Failed(e),
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub cleaned: DataFrame,
    pub cleaning: CleaningReport,
    pub summary: Summary,
    pub training: Stage<TrainResult>,
    pub comparison_chart: Stage<PathBuf>,
    /// One entry per charted column
    pub charts: Vec<(String, Stage<PathBuf>)>,
}

impl PipelineOutcome {
    /// Paths of every chart that was written
    pub fn written_charts(&self) -> Vec<&PathBuf> {
        self.charts
            .iter()
            .filter_map(|(_, stage)| stage.completed())
            .chain(self.comparison_chart.completed())
            .collect()
    }
}

/// Runs the stages in order against a [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured file and run every stage
    pub fn run(&self) -> Result<PipelineOutcome> {
        self.config.validate()?;
        let df = DataLoader::new().load_auto(&self.config.data_path)?;
        self.run_frame(&df)
    }

    /// Run every stage after loading on an in-memory frame
    pub fn run_frame(&self, df: &DataFrame) -> Result<PipelineOutcome> {
        self.config.validate()?;

        let filtered = self.apply_filters(df)?;
        let (cleaned, cleaning) = clean_with_report(&filtered)?;
        let summary = summarize(&cleaned)?;
        info!(
            rows = cleaned.height(),
            columns = cleaned.width(),
            duplicates_removed = cleaning.duplicates_removed,
            "Data prepared"
        );

        let renderer = ChartRenderer::new(self.config.render_config());

        let training = match &self.config.target_column {
            Some(target) => {
                let engine = TrainEngine::new(self.config.training_config(target));
                Stage::from_result(engine.train(&cleaned))
            }
            None => Stage::Skipped("no target column configured".to_string()),
        };
        if let Stage::Failed(e) = &training {
            warn!(error = %e, "Training stage failed");
        }

        let comparison_chart = match &training {
            Stage::Completed(result) => Stage::from_result(renderer.plot_comparison(
                &result.y_test.to_vec(),
                &result.predictions.to_vec(),
            )),
            _ => Stage::Skipped("no trained model".to_string()),
        };

        let plot_columns = self.plot_columns(&cleaned);
        let charts = if plot_columns.is_empty() {
            warn!("No numeric column to chart");
            Vec::new()
        } else {
            plot_columns
                .into_iter()
                .map(|col| {
                    let stage = Stage::from_result(renderer.plot_series_as(
                        &cleaned,
                        &col,
                        self.config.plot_kind,
                    ));
                    if let Stage::Failed(e) = &stage {
                        warn!(column = %col, error = %e, "Chart failed");
                    }
                    (col, stage)
                })
                .collect()
        };

        Ok(PipelineOutcome {
            cleaned,
            cleaning,
            summary,
            training,
            comparison_chart,
            charts,
        })
    }

    fn apply_filters(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        if let (Some(column), Some(range)) = (&self.config.date_column, &self.config.date_range) {
            out = filter_date_range(&out, column, range.start, range.end)?;
            info!(column = %column, rows = out.height(), "Applied date range");
        }
        if let Some(filter) = &self.config.category_filter {
            out = filter_equals(&out, &filter.column, &filter.value)?;
            info!(column = %filter.column, rows = out.height(), "Applied category filter");
        }
        if out.height() == 0 && df.height() > 0 {
            return Err(TabflowError::DataError(
                "filters removed every row".to_string(),
            ));
        }
        Ok(out)
    }

    /// Configured columns, or the first numeric column
    fn plot_columns(&self, df: &DataFrame) -> Vec<String> {
        if !self.config.plot_columns.is_empty() {
            return self.config.plot_columns.clone();
        }
        df.get_columns()
            .iter()
            .find(|c| is_numeric_dtype(c.dtype()))
            .map(|c| vec![c.name().to_string()])
            .unwrap_or_default()
    }
}
