//! tabflow - Tabular analysis pipeline
//!
//! This crate takes one CSV table through a fixed sequence of stages:
//! - Loading with null-token handling
//! - Cleaning (duplicate removal, mean/mode imputation)
//! - Descriptive summaries
//! - Model training with automatic task selection
//! - PNG charts of columns and predictions
//!
//! # Modules
//!
//! - [`preprocessing`] - Cleaning, encoding, summaries and row filters
//! - [`training`] - Linear regression and random forest training
//! - [`visualization`] - Trend, bar and comparison charts
//! - [`pipeline`] - Batch run over every stage
//! - [`cli`] - Command-line interface
//! - [`utils`] - CSV loading and saving

// Core error handling
pub mod error;

// Stages
pub mod preprocessing;
pub mod training;
pub mod visualization;
pub mod pipeline;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{Result, TabflowError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TabflowError};

    // Preprocessing
    pub use crate::preprocessing::{
        clean, clean_with_report, encode, summarize, CleaningReport, ColumnType, LabelEncoder,
        Summary,
    };

    // Training
    pub use crate::training::{
        select_task, train, TaskKind, TrainEngine, TrainResult, TrainedModel, TrainingConfig,
    };

    // Visualization
    pub use crate::visualization::{ChartKind, ChartRenderer, RenderConfig};

    // Pipeline
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutcome, Stage};

    // Loading
    pub use crate::utils::{load, DataLoader, DataSaver};
}
