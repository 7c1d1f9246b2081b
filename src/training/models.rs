//! Evaluation metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for model evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy (classification)
    pub accuracy: Option<f64>,
    /// Precision (binary classification)
    pub precision: Option<f64>,
    /// Recall (binary classification)
    pub recall: Option<f64>,
    /// F1 score (binary classification)
    pub f1_score: Option<f64>,
    /// Mean Squared Error (regression)
    pub mse: Option<f64>,
    /// Root Mean Squared Error (regression)
    pub rmse: Option<f64>,
    /// Mean Absolute Error (regression)
    pub mae: Option<f64>,
    /// R-squared (regression)
    pub r2: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of features
    pub n_features: usize,
    /// Number of training samples
    pub n_train: usize,
    /// Number of held-out samples
    pub n_test: usize,
}

impl ModelMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self {
            accuracy: None,
            precision: None,
            recall: None,
            f1_score: None,
            mse: None,
            rmse: None,
            mae: None,
            r2: None,
            training_time_secs: 0.0,
            n_features: 0,
            n_train: 0,
            n_test: 0,
        }
    }

    /// Compute classification metrics over integer class codes.
    /// Precision, recall and F1 are filled only when the target has exactly two classes.
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        n_classes: usize,
    ) -> Self {
        let mut metrics = Self::new();
        metrics.n_test = y_true.len();
        if y_true.is_empty() {
            return metrics;
        }

        let correct: usize = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        metrics.accuracy = Some(correct as f64 / y_true.len() as f64);

        // Class code 1 is the positive class
        if n_classes == 2 {
            let (tp, fp, _, fn_) = Self::confusion_counts(y_true, y_pred);

            let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
            let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
            metrics.precision = Some(precision);
            metrics.recall = Some(recall);
            metrics.f1_score = Some(if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            });
        }

        metrics
    }

    /// Compute regression metrics
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self::new();
        metrics.n_test = y_true.len();
        if y_true.is_empty() {
            return metrics;
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        metrics.mse = Some(mse);
        metrics.rmse = Some(mse.sqrt());
        metrics.mae = Some(errors.iter().map(|e| e.abs()).sum::<f64>() / n);

        // R² is undefined when the held-out targets have no variance; report 0
        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        metrics.r2 = Some(if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 });

        metrics
    }

    fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut tn = 0;
        let mut fn_ = 0;

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        (tp, fp, tn, fn_)
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}
