//! # Liquidity Math
//!
//! Regression models over dense numeric matrices.
//! This crate provides the three learners used by the liquidity forecaster:
//! a gradient-boosted tree ensemble, a random forest and an ordinary least
//! squares model, all behind the [`Regressor`] trait.

use thiserror::Error;

// Model modules
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod regressor;
pub mod tree;

pub use boosting::{BoostingParams, GradientBoostingRegressor};
pub use forest::{ForestParams, RandomForestRegressor};
pub use linear::LinearRegression;
pub use regressor::Regressor;
pub use tree::{RegressionTree, TreeParams};

/// Errors that can occur while fitting or applying a regressor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Singular system: {0}")]
    Singular(String),
}

/// Result type for regression operations
pub type Result<T> = std::result::Result<T, MathError>;
