//! Model training module
//!
//! Picks the task from the target column's declared type and fits:
//! - Ordinary least squares for numeric targets
//! - A random forest classifier for everything else
//!
//! Scores are computed on a shuffled held-out split.

mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod linear_models;
pub mod random_forest;

pub use config::{TaskKind, TrainingConfig};
pub use decision_tree::{DecisionTree, MaxFeatures, TreeNode};
pub use engine::{select_task, train, TrainEngine, TrainResult, TrainedModel};
pub use linear_models::LinearRegression;
pub use models::ModelMetrics;
pub use random_forest::RandomForest;
