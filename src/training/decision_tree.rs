//! Classification tree used as the forest's base learner

use crate::error::{Result, TabflowError};
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the predicted class code
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// How many features each split may look at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MaxFeatures {
    All,
    Sqrt,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Decision tree classifier over integer class codes stored as `f64`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fit on all rows with a fixed-seed generator
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        self.fit_indices(x, y, &indices, &mut rng)
    }

    /// Fit on a (possibly repeated) subset of rows, drawing feature subsets from `rng`
    pub fn fit_indices<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut R,
    ) -> Result<&mut Self> {
        let n_features = x.ncols();
        if x.nrows() != y.len() {
            return Err(TabflowError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(TabflowError::TrainingError("no training samples".to_string()));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];
        // Too few rows to split still yields a usable single-leaf tree
        self.root = Some(self.build_tree(x, y, indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(self)
    }

    fn build_tree<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let counts = class_counts(indices.iter().map(|&i| y[i]));
        let leaf = || TreeNode::Leaf {
            value: majority_class(&counts),
            n_samples,
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || counts.len() <= 1
            || self.n_features == 0;
        if should_stop {
            return leaf();
        }

        let n_try = self.max_features.resolve(self.n_features);
        let features = sample(rng, self.n_features, n_try).into_vec();

        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, indices, &features)
        else {
            return leaf();
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Best (feature, threshold, gain) among the candidate features
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let parent = class_counts(indices.iter().map(|&i| y[i]));
        let parent_impurity = self.impurity(&parent, indices.len());
        let n = indices.len() as f64;

        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                // Sweep sorted values once, moving rows from right to left
                let mut order: Vec<(f64, i64)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], class_key(y[i])))
                    .collect();
                order.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left: BTreeMap<i64, usize> = BTreeMap::new();
                let mut right = parent.clone();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..order.len() - 1 {
                    let (value, class) = order[pos];
                    *left.entry(class).or_insert(0) += 1;
                    if let Some(c) = right.get_mut(&class) {
                        *c -= 1;
                    }

                    let next = order[pos + 1].0;
                    if next <= value {
                        continue;
                    }
                    let left_count = pos + 1;
                    let right_count = order.len() - left_count;
                    if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left_count as f64 * self.impurity(&left, left_count)
                        + right_count as f64 * self.impurity(&right, right_count))
                        / n;
                    let gain = parent_impurity - weighted;
                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (value + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // Ties resolve to the lowest feature index so results do not depend on sampling order
        feature_results.into_iter().flatten().fold(None, |acc, cand| match acc {
            None => Some(cand),
            Some(best) => {
                if cand.2 > best.2 || (cand.2 == best.2 && cand.0 < best.0) {
                    Some(cand)
                } else {
                    Some(best)
                }
            }
        })
    }

    fn impurity(&self, counts: &BTreeMap<i64, usize>, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        1.0 - counts.values().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(TabflowError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TabflowError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => break *value,
                        TreeNode::Split {
                            feature_idx,
                            threshold,
                            left,
                            right,
                            ..
                        } => {
                            node = if row[*feature_idx] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect())
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

fn class_key(value: f64) -> i64 {
    value.round() as i64
}

fn class_counts(values: impl Iterator<Item = f64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for v in values {
        *counts.entry(class_key(v)).or_insert(0) += 1;
    }
    counts
}

/// Most common class; ties go to the smallest code
pub(crate) fn majority_class(counts: &BTreeMap<i64, usize>) -> f64 {
    let mut best: Option<(i64, usize)> = None;
    for (&class, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((class, count));
        }
    }
    best.map_or(0.0, |(class, _)| class as f64)
}
