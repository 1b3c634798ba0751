//! Three-model ensemble fitted per trade side

use crate::config::ForecastConfig;
use crate::data::Side;
use crate::error::{ForecastError, Result};
use crate::supervised::SupervisedMatrices;
use liquidity_math::{
    GradientBoostingRegressor, LinearRegression, RandomForestRegressor, Regressor,
};
use ndarray::Array1;
use std::fmt;
use tracing::{debug, info};

/// Members of the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Gradient-boosted regression trees
    GradientBoosting,
    /// Bagged regression trees
    RandomForest,
    /// Ordinary least squares
    Linear,
}

impl ModelKind {
    /// Every member, in blend order
    pub const ALL: [ModelKind; 3] = [
        ModelKind::GradientBoosting,
        ModelKind::RandomForest,
        ModelKind::Linear,
    ];

    /// Unfitted regressor configured from `config`
    pub fn build(self, config: &ForecastConfig) -> Box<dyn Regressor> {
        match self {
            ModelKind::GradientBoosting => Box::new(GradientBoostingRegressor::new(
                config.gradient_boosting.clone(),
            )),
            ModelKind::RandomForest => {
                Box::new(RandomForestRegressor::new(config.random_forest.clone()))
            }
            ModelKind::Linear => Box::new(LinearRegression::new(config.linear.fit_intercept)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::RandomForest => "random_forest",
            ModelKind::Linear => "linear_regression",
        };
        write!(f, "{}", name)
    }
}

/// Clamped test-set predictions of every member for one side
#[derive(Debug, Clone, PartialEq)]
pub struct SidePredictions {
    /// Gradient boosting member, one value per bond
    pub gradient_boosting: Array1<f64>,
    /// Random forest member, one value per bond
    pub random_forest: Array1<f64>,
    /// Linear member, one value per bond
    pub linear: Array1<f64>,
}

impl SidePredictions {
    /// Predictions of one member
    pub fn get(&self, kind: ModelKind) -> &Array1<f64> {
        match kind {
            ModelKind::GradientBoosting => &self.gradient_boosting,
            ModelKind::RandomForest => &self.random_forest,
            ModelKind::Linear => &self.linear,
        }
    }

    /// Number of predicted bonds
    pub fn len(&self) -> usize {
        self.linear.len()
    }

    /// Whether no bond was predicted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the three members per bond
    pub fn member_sum(&self) -> Array1<f64> {
        &self.gradient_boosting + &self.random_forest + &self.linear
    }
}

/// Fits the ensemble on one side's matrices and predicts the next day
#[derive(Debug, Clone, Copy)]
pub struct EnsembleForecaster<'a> {
    config: &'a ForecastConfig,
}

impl<'a> EnsembleForecaster<'a> {
    /// Create a forecaster with the model sections of `config`
    pub fn new(config: &'a ForecastConfig) -> Self {
        Self { config }
    }

    /// Fit all three members on `train_x`/`train_y`, then predict `test_x`
    ///
    /// The members are fitted concurrently; each is seeded independently so
    /// the outcome does not depend on scheduling.
    pub fn fit_predict(&self, matrices: &SupervisedMatrices) -> Result<SidePredictions> {
        info!(
            "Fitting {:?} ensemble on {} rows x {} features",
            matrices.side,
            matrices.train_x.nrows(),
            matrices.train_x.ncols()
        );

        let (gradient_boosting, (random_forest, linear)) = rayon::join(
            || self.fit_member(ModelKind::GradientBoosting, matrices),
            || {
                rayon::join(
                    || self.fit_member(ModelKind::RandomForest, matrices),
                    || self.fit_member(ModelKind::Linear, matrices),
                )
            },
        );

        Ok(SidePredictions {
            gradient_boosting: gradient_boosting?,
            random_forest: random_forest?,
            linear: linear?,
        })
    }

    fn fit_member(&self, kind: ModelKind, matrices: &SupervisedMatrices) -> Result<Array1<f64>> {
        let mut model = kind.build(self.config);
        model
            .fit(&matrices.train_x, &matrices.train_y)
            .map_err(|e| fit_error(kind, matrices.side, e))?;
        let mut predictions = model
            .predict(&matrices.test_x)
            .map_err(|e| fit_error(kind, matrices.side, e))?;

        let clamped = predictions.iter().filter(|v| **v < 0.0).count();
        predictions.mapv_inplace(|v| v.max(0.0));
        debug!(
            "{} ({:?}): {} predictions, {} clamped to zero",
            kind,
            matrices.side,
            predictions.len(),
            clamped
        );

        Ok(predictions)
    }
}

fn fit_error(kind: ModelKind, side: Side, err: liquidity_math::MathError) -> ForecastError {
    ForecastError::Fit(format!("{} ({:?} side): {}", kind, side, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn small_config() -> ForecastConfig {
        let mut config = ForecastConfig::default();
        config.gradient_boosting.n_estimators = 50;
        config.gradient_boosting.learning_rate = 0.1;
        config.random_forest.n_trees = 20;
        config.random_forest.max_features = Some(2);
        config
    }

    fn matrices() -> SupervisedMatrices {
        // Next-day volume tracks the previous day with an offset on the static column
        let rows = 12;
        let train_x = Array2::from_shape_fn((rows, 3), |(r, c)| match c {
            0 => (r % 3) as f64,
            1 => (r * 2) as f64,
            _ => (r * 3 % 7) as f64,
        });
        let train_y = Array1::from_shape_fn(rows, |r| train_x[[r, 2]] + train_x[[r, 0]]);
        let test_x = Array2::from_shape_fn((rows, 3), |(r, c)| match c {
            0 => (r % 3) as f64,
            1 => (r * 3 % 7) as f64,
            _ => train_y[r],
        });
        SupervisedMatrices {
            side: Side::Buy,
            bonds: (0..rows).map(|r| format!("B{}", r)).collect(),
            columns: vec!["static".into(), "lag_2".into(), "lag_1".into()],
            train_x,
            train_y,
            test_x,
        }
    }

    #[test]
    fn test_predictions_are_non_negative_and_complete() {
        let config = small_config();
        let predictions = EnsembleForecaster::new(&config)
            .fit_predict(&matrices())
            .unwrap();

        assert_eq!(predictions.len(), 12);
        for kind in ModelKind::ALL {
            assert!(predictions.get(kind).iter().all(|v| *v >= 0.0 && v.is_finite()));
        }
    }

    #[test]
    fn test_fit_is_reproducible() {
        let config = small_config();
        let forecaster = EnsembleForecaster::new(&config);
        let first = forecaster.fit_predict(&matrices()).unwrap();
        let second = forecaster.fit_predict(&matrices()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_linear_predictions_are_clamped() {
        let config = small_config();
        let mut m = matrices();
        // Falling target extrapolates below zero on the test rows
        m.train_y = Array1::from_shape_fn(12, |r| 12.0 - m.train_x[[r, 1]] / 2.0);
        m.test_x.column_mut(1).fill(100.0);
        let predictions = EnsembleForecaster::new(&config).fit_predict(&m).unwrap();
        assert!(predictions.linear.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_non_finite_input_is_fit_error() {
        let config = small_config();
        let mut m = matrices();
        m.train_x[[3, 1]] = f64::NAN;
        let err = EnsembleForecaster::new(&config).fit_predict(&m).unwrap_err();
        assert!(matches!(err, ForecastError::Fit(_)));
        assert!(err.to_string().contains("Buy"));
    }

    #[test]
    fn test_member_sum() {
        let predictions = SidePredictions {
            gradient_boosting: Array1::from(vec![1.0, 0.0]),
            random_forest: Array1::from(vec![2.0, 1.0]),
            linear: Array1::from(vec![3.0, 0.5]),
        };
        assert_eq!(predictions.member_sum().to_vec(), vec![6.0, 1.5]);
        assert_eq!(ModelKind::RandomForest.to_string(), "random_forest");
    }
}
