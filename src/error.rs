//! Error types for the tabflow pipeline

use thiserror::Error;

/// Result type alias for tabflow operations
pub type Result<T> = std::result::Result<T, TabflowError>;

/// Main error type for the pipeline.
///
/// Each stage reports failures under its own kind: the loader uses
/// [`TabflowError::LoadError`], training uses [`TabflowError::TrainingError`]
/// and the renderer uses [`TabflowError::RenderError`].
#[derive(Error, Debug)]
pub enum TabflowError {
    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl TabflowError {
    /// Re-tag any error as a training failure, keeping its message.
    pub(crate) fn into_training(self) -> Self {
        match self {
            TabflowError::TrainingError(_) => self,
            other => TabflowError::TrainingError(other.to_string()),
        }
    }

    /// Re-tag any error as a rendering failure, keeping its message.
    pub(crate) fn into_render(self) -> Self {
        match self {
            TabflowError::RenderError(_) => self,
            other => TabflowError::RenderError(other.to_string()),
        }
    }
}

impl From<polars::error::PolarsError> for TabflowError {
    fn from(err: polars::error::PolarsError) -> Self {
        TabflowError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TabflowError {
    fn from(err: serde_json::Error) -> Self {
        TabflowError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TabflowError {
    fn from(err: ndarray::ShapeError) -> Self {
        TabflowError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<image::ImageError> for TabflowError {
    fn from(err: image::ImageError) -> Self {
        TabflowError::RenderError(err.to_string())
    }
}
