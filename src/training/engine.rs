//! Training engine: task selection, encoding, split, fit and scoring

use super::config::{TaskKind, TrainingConfig};
use super::linear_models::LinearRegression;
use super::models::ModelMetrics;
use super::random_forest::RandomForest;
use crate::error::{Result, TabflowError};
use crate::preprocessing::{is_numeric_dtype, LabelEncoder};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    RandomForest(RandomForest),
}

impl TrainedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LinearRegression(m) => m.predict(x),
            TrainedModel::RandomForest(m) => m.predict(x),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrainedModel::LinearRegression(_) => "LinearRegression",
            TrainedModel::RandomForest(_) => "RandomForestClassifier",
        }
    }
}

/// Everything produced by one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResult {
    pub model: TrainedModel,
    pub task: TaskKind,
    /// R² for regression, accuracy for classification
    pub score: f64,
    pub target_column: String,
    /// Every column except the target, in frame order
    pub feature_columns: Vec<String>,
    /// Held-out targets (class codes for classification)
    pub y_test: Array1<f64>,
    /// Held-out predictions aligned with `y_test`
    pub predictions: Array1<f64>,
    /// Encoder fitted on the training frame; reused by [`TrainResult::predict`]
    pub encoder: LabelEncoder,
    pub metrics: ModelMetrics,
}

impl TrainResult {
    /// Predict on a frame containing the feature columns.
    ///
    /// Non-numeric features are encoded with the codes learned at training time.
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let features = df
            .select(self.feature_columns.iter().map(|c| c.as_str()))
            .map_err(|e| TabflowError::FeatureNotFound(e.to_string()))?;
        let encoded = self.encoder.transform(&features)?;
        let x = columns_to_array2(&encoded, &self.feature_columns)?;
        self.model.predict(&x)
    }

    /// Held-out predictions in the target's original labels
    pub fn decoded_predictions(&self) -> Result<Vec<String>> {
        if self.encoder.is_encoded(&self.target_column) {
            self.encoder
                .inverse_transform_column(&self.target_column, &self.predictions.to_vec())
        } else {
            Ok(self.predictions.iter().map(|p| p.to_string()).collect())
        }
    }

    /// Per-feature importance: forest impurity decrease or absolute OLS coefficient
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let values = match &self.model {
            TrainedModel::RandomForest(m) => m.feature_importances().cloned(),
            TrainedModel::LinearRegression(m) => m.coefficients.as_ref().map(|c| c.mapv(f64::abs)),
        };
        values
            .map(|v| self.feature_columns.iter().cloned().zip(v.iter().copied()).collect())
            .unwrap_or_default()
    }
}

/// Choose the task from the target's declared dtype only
pub fn select_task(df: &DataFrame, target: &str) -> Result<TaskKind> {
    let col = df.column(target).map_err(|_| {
        TabflowError::TrainingError(format!("target column '{}' not found", target))
    })?;
    Ok(if is_numeric_dtype(col.dtype()) {
        TaskKind::Regression
    } else {
        TaskKind::Classification
    })
}

/// Train with default settings
pub fn train(df: &DataFrame, target: &str) -> Result<TrainResult> {
    TrainEngine::new(TrainingConfig::new(target)).train(df)
}

/// Main training engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Validate, encode, split, fit and score. Every failure is a `TrainingError`.
    pub fn train(&self, df: &DataFrame) -> Result<TrainResult> {
        self.train_inner(df).map_err(TabflowError::into_training)
    }

    fn train_inner(&self, df: &DataFrame) -> Result<TrainResult> {
        let start = Instant::now();
        let target = self.config.target_column.as_str();

        let feature_columns = self.validate(df)?;
        let task = select_task(df, target)?;

        let mut encoder = LabelEncoder::new();
        let encoded = encoder.fit_transform(df)?;

        let x = columns_to_array2(&encoded, &feature_columns)?;
        let y = columns_to_array2(&encoded, &[target.to_string()])?.column(0).to_owned();

        let mut rng = match self.config.random_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let (train_idx, test_idx) = split_indices(x.nrows(), self.config.test_size, &mut rng)?;
        let x_train = x.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = x.select(Axis(0), &test_idx);
        let y_test = y.select(Axis(0), &test_idx);
        debug!(
            n_train = train_idx.len(),
            n_test = test_idx.len(),
            n_features = feature_columns.len(),
            "Split dataset"
        );

        let model = self.fit_model(task, &x_train, &y_train)?;
        let predictions = model.predict(&x_test)?;

        let mut metrics = match task {
            TaskKind::Regression => ModelMetrics::compute_regression(&y_test, &predictions),
            TaskKind::Classification => {
                let n_classes = encoder.classes(target).map_or(0, <[String]>::len);
                ModelMetrics::compute_classification(&y_test, &predictions, n_classes)
            }
        };
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = feature_columns.len();
        metrics.n_train = train_idx.len();
        metrics.n_test = test_idx.len();

        let score = match task {
            TaskKind::Regression => metrics.r2,
            TaskKind::Classification => metrics.accuracy,
        }
        .unwrap_or(0.0);

        info!(
            task = %task,
            model = model.name(),
            score,
            elapsed_secs = metrics.training_time_secs,
            "Training complete"
        );

        Ok(TrainResult {
            model,
            task,
            score,
            target_column: target.to_string(),
            feature_columns,
            y_test,
            predictions,
            encoder,
            metrics,
        })
    }

    /// Returns the feature columns when the frame is trainable
    fn validate(&self, df: &DataFrame) -> Result<Vec<String>> {
        let target = self.config.target_column.as_str();
        if df.column(target).is_err() {
            return Err(TabflowError::TrainingError(format!(
                "target column '{}' not found",
                target
            )));
        }
        if df.height() < 2 {
            return Err(TabflowError::TrainingError(format!(
                "need at least 2 rows to split, got {}",
                df.height()
            )));
        }

        let feature_columns: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|name| name.to_string())
            .collect();
        if feature_columns.is_empty() {
            return Err(TabflowError::TrainingError(
                "no feature columns besides the target".to_string(),
            ));
        }

        if let Some(col) = df.get_columns().iter().find(|c| c.null_count() > 0) {
            return Err(TabflowError::TrainingError(format!(
                "column '{}' has {} missing values; clean the data first",
                col.name(),
                col.null_count()
            )));
        }

        Ok(feature_columns)
    }

    fn fit_model(&self, task: TaskKind, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel> {
        Ok(match task {
            TaskKind::Regression => {
                let mut model = LinearRegression::new().with_fit_intercept(self.config.fit_intercept);
                model.fit(x, y)?;
                TrainedModel::LinearRegression(model)
            }
            TaskKind::Classification => {
                let mut model = RandomForest::new(self.config.n_estimators)
                    .with_max_depth(self.config.max_depth)
                    .with_min_samples_split(self.config.min_samples_split)
                    .with_min_samples_leaf(self.config.min_samples_leaf)
                    .with_random_state(self.config.random_seed);
                model.fit(x, y)?;
                TrainedModel::RandomForest(model)
            }
        })
    }
}

/// Shuffle row indices and cut off `ceil(n * test_size)` for testing,
/// leaving at least one row on each side.
pub(crate) fn split_indices(
    n: usize,
    test_size: f64,
    rng: &mut ChaCha8Rng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TabflowError::ConfigError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if n < 2 {
        return Err(TabflowError::TrainingError(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Extract named columns into a row-major `Array2<f64>`; nulls are rejected
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| {
            let col = df
                .column(name)
                .map_err(|_| TabflowError::FeatureNotFound(name.clone()))?;
            let cast = col.as_materialized_series().cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        TabflowError::DataError(format!("missing value in column '{}'", name))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| col_data[c][r]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_frame() -> DataFrame {
        df!(
            "feature1" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            "feature2" => &[1.5, 3.1, 2.8, 7.2, 5.5, 11.0, 8.3, 14.1, 12.7, 19.5],
            "target" => &[3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0, 27.0, 30.0]
        )
        .unwrap()
    }

    fn classification_frame() -> DataFrame {
        let size: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let label: Vec<&str> = (0..20).map(|i| if i < 10 { "small" } else { "large" }).collect();
        let colour: Vec<&str> = (0..20).map(|i| if i % 2 == 0 { "red" } else { "blue" }).collect();
        df!("size" => size, "colour" => colour, "label" => label).unwrap()
    }

    #[test]
    fn test_select_task_uses_declared_dtype() {
        let df = df!(
            "price" => &[1.0, 2.0],
            "flag" => &[0i64, 1],
            "kind" => &["a", "b"]
        )
        .unwrap();
        assert_eq!(select_task(&df, "price").unwrap(), TaskKind::Regression);
        assert_eq!(select_task(&df, "flag").unwrap(), TaskKind::Regression);
        assert_eq!(select_task(&df, "kind").unwrap(), TaskKind::Classification);
        assert!(matches!(
            select_task(&df, "nope"),
            Err(TabflowError::TrainingError(_))
        ));
    }

    #[test]
    fn test_regression_fit() {
        let result = TrainEngine::new(TrainingConfig::new("target").with_random_seed(3))
            .train(&regression_frame())
            .unwrap();

        assert_eq!(result.task, TaskKind::Regression);
        assert_eq!(result.feature_columns, vec!["feature1", "feature2"]);
        assert_eq!(result.y_test.len(), 2);
        assert_eq!(result.predictions.len(), 2);
        for (p, t) in result.predictions.iter().zip(result.y_test.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
        assert!(matches!(result.model, TrainedModel::LinearRegression(_)));
    }

    #[test]
    fn test_classification_fit() {
        let result = TrainEngine::new(
            TrainingConfig::new("label").with_random_seed(11).with_n_estimators(20),
        )
        .train(&classification_frame())
        .unwrap();

        assert_eq!(result.task, TaskKind::Classification);
        assert!((0.0..=1.0).contains(&result.score));
        assert_eq!(result.y_test.len(), 4);
        let labels = result.decoded_predictions().unwrap();
        assert!(labels.iter().all(|l| l == "small" || l == "large"));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let engine = TrainEngine::new(
            TrainingConfig::new("label").with_random_seed(5).with_n_estimators(15),
        );
        let a = engine.train(&classification_frame()).unwrap();
        let b = engine.train(&classification_frame()).unwrap();
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.predictions, b.predictions);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn test_predict_reuses_encoder() {
        let result = TrainEngine::new(
            TrainingConfig::new("label").with_random_seed(2).with_n_estimators(10),
        )
        .train(&classification_frame())
        .unwrap();

        // Only one colour value present: a fresh encoding would give it code 0
        let new_rows = df!("size" => &[1.0, 18.0], "colour" => &["red", "red"]).unwrap();
        let preds = result.predict(&new_rows).unwrap();
        assert_eq!(preds.len(), 2);

        let unseen = df!("size" => &[1.0], "colour" => &["green"]).unwrap();
        assert!(result.predict(&unseen).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let engine = TrainEngine::new(TrainingConfig::new("y"));

        let one_row = df!("x" => &[1.0], "y" => &[2.0]).unwrap();
        assert!(matches!(engine.train(&one_row), Err(TabflowError::TrainingError(_))));

        let target_only = df!("y" => &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(engine.train(&target_only), Err(TabflowError::TrainingError(_))));

        let with_nulls = df!("x" => &[Some(1.0), None, Some(3.0)], "y" => &[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(engine.train(&with_nulls), Err(TabflowError::TrainingError(_))));

        let no_target = df!("x" => &[1.0, 2.0]).unwrap();
        assert!(matches!(engine.train(&no_target), Err(TabflowError::TrainingError(_))));
    }

    #[test]
    fn test_split_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (train, test) = split_indices(10, 0.2, &mut rng).unwrap();
        assert_eq!((train.len(), test.len()), (8, 2));

        let (train, test) = split_indices(3, 0.2, &mut rng).unwrap();
        assert_eq!((train.len(), test.len()), (2, 1));

        let (train, test) = split_indices(2, 0.9, &mut rng).unwrap();
        assert_eq!((train.len(), test.len()), (1, 1));

        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, vec![0, 1]);

        assert!(split_indices(10, 1.0, &mut rng).is_err());
    }

    #[test]
    fn test_feature_importances_named() {
        let result = TrainEngine::new(TrainingConfig::new("target").with_random_seed(1))
            .train(&regression_frame())
            .unwrap();
        let names: Vec<String> = result.feature_importances().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["feature1", "feature2"]);
    }
}
