//! Common interface for regressors and input validation

use crate::{MathError, Result};
use ndarray::{Array1, Array2};

/// A regressor that can be fitted on a numeric matrix and a continuous target
pub trait Regressor: Send {
    /// Fit the model on `x` (one row per sample) and `y`
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Reject empty, misaligned or non-finite training input
pub fn validate_training(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(MathError::InsufficientData(format!(
            "Training matrix is empty ({} x {})",
            x.nrows(),
            x.ncols()
        )));
    }

    if x.nrows() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Training matrix has {} rows but target has {} values",
            x.nrows(),
            y.len()
        )));
    }

    check_finite(x)?;

    if let Some(pos) = y.iter().position(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "Non-finite target value at row {}",
            pos
        )));
    }

    Ok(())
}

/// Reject a prediction matrix whose width differs from the fitted one
pub fn validate_features(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(MathError::InvalidInput(format!(
            "Expected {} feature columns, got {}",
            n_features,
            x.ncols()
        )));
    }

    check_finite(x)
}

fn check_finite(x: &Array2<f64>) -> Result<()> {
    for ((row, col), value) in x.indexed_iter() {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "Non-finite feature value at row {}, column {}",
                row, col
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validate_training_rejects_nan() {
        let x = array![[1.0, f64::NAN], [2.0, 3.0]];
        let y = array![1.0, 2.0];
        let err = validate_training(&x, &y).unwrap_err();
        assert!(matches!(err, MathError::InvalidInput(_)));
        assert!(err.to_string().contains("row 0, column 1"));
    }

    #[test]
    fn test_validate_training_rejects_length_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(validate_training(&x, &y).is_err());
    }

    #[test]
    fn test_validate_training_rejects_empty() {
        let x = Array2::<f64>::zeros((0, 3));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(
            validate_training(&x, &y),
            Err(MathError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_validate_features_width() {
        let x = array![[1.0, 2.0]];
        assert!(validate_features(&x, 2).is_ok());
        assert!(validate_features(&x, 3).is_err());
    }
}
