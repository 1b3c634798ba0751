//! Gradient boosting with squared loss
//!
//! Starts from the target mean and adds shrunken regression trees fitted to
//! the current residuals.

use crate::regressor::{validate_features, validate_training, Regressor};
use crate::tree::{RegressionTree, TreeParams};
use crate::{MathError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting stages (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples required in a leaf node
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each stage
    pub subsample: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 1000,
            learning_rate: 0.001,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            seed: 1,
        }
    }
}

impl BoostingParams {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(MathError::InvalidInput(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(MathError::InvalidInput(
                "learning_rate must be a positive number".to_string(),
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(MathError::InvalidInput(
                "subsample must be in (0, 1]".to_string(),
            ));
        }
        self.tree_params().validate()
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: Some(self.max_depth),
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: None,
        }
    }
}

/// Gradient-boosted regression trees
#[derive(Debug, Clone)]
pub struct GradientBoostingRegressor {
    params: BoostingParams,
    init: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoostingRegressor {
    /// Create a new booster
    pub fn new(params: BoostingParams) -> Self {
        Self {
            params,
            init: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Initial (stage 0) prediction, the training target mean
    pub fn init_value(&self) -> f64 {
        self.init
    }

    /// Number of fitted stages
    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(BoostingParams::default())
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training(x, y)?;
        self.params.validate()?;

        let n_samples = x.nrows();
        let lr = self.params.learning_rate;
        let tree_params = self.params.tree_params();
        let sample_size = ((n_samples as f64 * self.params.subsample).round() as usize).max(1);
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);

        self.init = y.sum() / n_samples as f64;
        let mut current = vec![self.init; n_samples];
        let mut residuals = vec![0.0; n_samples];
        let mut rows: Vec<usize> = (0..n_samples).collect();
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for stage in 0..self.params.n_estimators {
            for (r, (target, pred)) in residuals.iter_mut().zip(y.iter().zip(current.iter())) {
                *r = target - pred;
            }

            let stage_rows: &[usize] = if sample_size < n_samples {
                rows.shuffle(&mut rng);
                &rows[..sample_size]
            } else {
                &rows
            };

            let mut tree = RegressionTree::new(tree_params);
            tree.fit_indices(x.view(), &residuals, stage_rows, &mut rng)?;

            for (pred, row) in current.iter_mut().zip(x.rows()) {
                *pred += lr * tree.predict_row(row);
            }
            trees.push(tree);

            if stage > 0 && stage % 250 == 0 {
                debug!("Boosting stage {}/{}", stage, self.params.n_estimators);
            }
        }

        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(MathError::NotFitted);
        }
        validate_features(x, self.n_features)?;

        let lr = self.params.learning_rate;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.init, |acc, tree| acc + lr * tree.predict_row(row))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "gradient_boosting"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_single_stage_moves_toward_target() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 10.0, 10.0];
        let mut gbm = GradientBoostingRegressor::new(BoostingParams {
            n_estimators: 1,
            learning_rate: 0.5,
            ..BoostingParams::default()
        });
        gbm.fit(&x, &y).unwrap();

        assert_relative_eq!(gbm.init_value(), 5.0);
        let preds = gbm.predict(&x).unwrap();
        // Residuals are -5 / +5, shrunk by half
        assert_relative_eq!(preds[0], 2.5);
        assert_relative_eq!(preds[3], 7.5);
    }

    #[test]
    fn test_many_stages_fit_training_data() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| (i + j * 7) as f64);
        let y: Array1<f64> = x.rows().into_iter().map(|r| 3.0 * r[0] + 1.0).collect();
        let mut gbm = GradientBoostingRegressor::new(BoostingParams {
            n_estimators: 300,
            learning_rate: 0.1,
            ..BoostingParams::default()
        });
        gbm.fit(&x, &y).unwrap();
        assert_eq!(gbm.n_stages(), 300);

        let preds = gbm.predict(&x).unwrap();
        let mse = preds
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 5.0, "mse = {}", mse);
    }

    #[test]
    fn test_subsampled_fit_is_reproducible() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| ((i * 5 + j) % 11) as f64);
        let y: Array1<f64> = x.rows().into_iter().map(|r| r[0] - r[1]).collect();
        let params = BoostingParams {
            n_estimators: 50,
            learning_rate: 0.2,
            subsample: 0.5,
            ..BoostingParams::default()
        };

        let mut a = GradientBoostingRegressor::new(params.clone());
        let mut b = GradientBoostingRegressor::new(params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_invalid_learning_rate() {
        let params = BoostingParams {
            learning_rate: 0.0,
            ..BoostingParams::default()
        };
        assert!(params.validate().is_err());
    }
}
