//! Training configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of learning task, chosen from the target column's declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Continuous numeric prediction
    Regression,
    /// Discrete label prediction
    Classification,
}

impl TaskKind {
    /// Name of the held-out metric reported for this task
    pub fn metric_name(&self) -> &'static str {
        match self {
            TaskKind::Regression => "R²",
            TaskKind::Classification => "Accuracy",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Regression => write!(f, "regression"),
            TaskKind::Classification => write!(f, "classification"),
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,

    /// Fraction of rows held out for scoring
    pub test_size: f64,

    /// Seed for the split and the forest (None = fresh entropy every run)
    pub random_seed: Option<u64>,

    /// Number of trees in the classification forest
    pub n_estimators: usize,

    /// Maximum depth of each tree (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// Whether the linear model fits an intercept
    pub fit_intercept: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "target".to_string(),
            test_size: 0.2,
            random_seed: None,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            fit_intercept: true,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration for the given target column
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Default::default()
        }
    }

    /// Set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Make the split and the forest reproducible
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set the maximum tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}
