//! Visualization module: PNG charts for columns and predictions.

mod canvas;
mod charts;

pub use charts::{sanitize_file_stem, ChartKind, ChartRenderer, RenderConfig, COMPARISON_FILE};
