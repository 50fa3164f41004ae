//! Gradient-boosted regression trees
//!
//! Second-order boosting with squared-error loss: every round fits a depth
//! limited tree to the current gradients using exact greedy split search and
//! L2-regularised leaf weights.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Minimum loss reduction for a split to be kept
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// Hyperparameters of the boosted ensemble
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// L2 penalty on leaf weights
    pub reg_lambda: f64,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            learning_rate: 0.1,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

impl BoostingParams {
    /// Check that every parameter is in range
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(MathError::InvalidInput(
                "n_estimators must be greater than zero".to_string(),
            ));
        }
        if self.learning_rate <= 0.0 || self.learning_rate > 1.0 {
            return Err(MathError::InvalidInput(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if self.reg_lambda < 0.0 || self.min_child_weight < 0.0 {
            return Err(MathError::InvalidInput(
                "reg_lambda and min_child_weight must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf { weight } => *weight,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] < *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A single regression tree fitted to gradient statistics
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    fn fit(features: &[Vec<f64>], gradients: &[f64], params: &BoostingParams) -> Self {
        let indices: Vec<usize> = (0..features.len()).collect();
        Self {
            root: Self::grow(features, gradients, &indices, params, 0),
        }
    }

    fn grow(
        features: &[Vec<f64>],
        gradients: &[f64],
        indices: &[usize],
        params: &BoostingParams,
        depth: usize,
    ) -> Node {
        // Squared error: hessian is 1 per row
        let g: f64 = indices.iter().map(|&i| gradients[i]).sum();
        let h = indices.len() as f64;
        let leaf = Node::Leaf {
            weight: -g / (h + params.reg_lambda),
        };

        if depth >= params.max_depth || indices.len() < 2 {
            return leaf;
        }

        let Some(split) = Self::best_split(features, gradients, indices, params, g, h) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| features[i][split.feature] < split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(Self::grow(features, gradients, &left, params, depth + 1)),
            right: Box::new(Self::grow(features, gradients, &right, params, depth + 1)),
        }
    }

    fn best_split(
        features: &[Vec<f64>],
        gradients: &[f64],
        indices: &[usize],
        params: &BoostingParams,
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        let lambda = params.reg_lambda;
        let parent_score = g_total * g_total / (h_total + lambda);
        let n_features = features[indices[0]].len();
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..n_features {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for pair in sorted.windows(2) {
                let (current, next) = (pair[0], pair[1]);
                g_left += gradients[current];
                h_left += 1.0;

                let (x_current, x_next) = (features[current][feature], features[next][feature]);
                if x_current == x_next {
                    continue;
                }

                let g_right = g_total - g_left;
                let h_right = h_total - h_left;
                if h_left < params.min_child_weight || h_right < params.min_child_weight {
                    continue;
                }

                let gain = 0.5
                    * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                        - parent_score);
                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: 0.5 * (x_current + x_next),
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Predict the leaf weight for one feature row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.root.predict(row)
    }

    /// Depth of the deepest leaf
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// Boosted ensemble of regression trees
#[derive(Debug, Clone)]
pub struct GradientBoostedRegressor {
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fit the ensemble on feature rows and targets
    pub fn fit(features: &[Vec<f64>], target: &[f64], params: &BoostingParams) -> Result<Self> {
        params.validate()?;
        if features.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a boosted model on zero rows".to_string(),
            ));
        }
        if features.len() != target.len() {
            return Err(MathError::InvalidInput(format!(
                "Got {} feature rows for {} targets",
                features.len(),
                target.len()
            )));
        }
        let width = features[0].len();
        if width == 0 || features.iter().any(|row| row.len() != width) {
            return Err(MathError::InvalidInput(
                "Feature rows must be non-empty and of equal width".to_string(),
            ));
        }
        if target.iter().any(|y| !y.is_finite()) {
            return Err(MathError::InvalidInput(
                "Targets must be finite".to_string(),
            ));
        }

        let base_score = crate::mean(target);
        let mut predictions = vec![base_score; target.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let gradients: Vec<f64> = predictions
                .iter()
                .zip(target)
                .map(|(p, y)| p - y)
                .collect();
            let tree = RegressionTree::fit(features, &gradients, params);
            for (pred, row) in predictions.iter_mut().zip(features) {
                *pred += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            base_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    /// Predict one row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| self.learning_rate * tree.predict(row))
                .sum::<f64>()
    }

    /// Predict many rows
    pub fn predict_many(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Fitted trees
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}
