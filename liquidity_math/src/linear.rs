//! Ordinary least squares linear regression
//!
//! Solves the normal equations on mean-centred data, so the intercept is
//! recovered as `mean(y) - mean(x) · β`.

use crate::regressor::{validate_features, validate_training, Regressor};
use crate::{MathError, Result};
use ndarray::{Array1, Array2, Axis};

/// Diagonal loading relative to the mean diagonal of X'X
const RIDGE: f64 = 1e-10;

/// Linear Regression model using Ordinary Least Squares
#[derive(Debug, Clone)]
pub struct LinearRegression {
    fit_intercept: bool,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinearRegression {
    /// Create a new LinearRegression model
    pub fn new(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Fitted coefficients, one per feature
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    /// Fitted intercept (0 when the model has no intercept)
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        validate_training(x, y)?;

        let (x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .ok_or_else(|| MathError::InsufficientData("Empty feature matrix".to_string()))?;
            (x_mean, y.sum() / y.len() as f64)
        } else {
            (Array1::zeros(x.ncols()), 0.0)
        };

        let xc = x - &x_mean;
        let yc = y - y_mean;

        let mut xtx = xc.t().dot(&xc);
        let xty = xc.t().dot(&yc);

        let n = xtx.nrows();
        let mean_diag = xtx.diag().sum() / n as f64;
        let ridge = RIDGE * mean_diag.max(1.0);
        for i in 0..n {
            xtx[[i, i]] += ridge;
        }

        let beta = match cholesky_solve(&xtx, &xty) {
            Some(beta) => beta,
            None => gaussian_solve(xtx, xty)?,
        };

        self.intercept = if self.fit_intercept {
            y_mean - x_mean.dot(&beta)
        } else {
            0.0
        };
        self.coefficients = Some(beta);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let beta = self.coefficients.as_ref().ok_or(MathError::NotFitted)?;
        validate_features(x, beta.len())?;
        Ok(x.dot(beta) + self.intercept)
    }

    fn name(&self) -> &str {
        "linear_regression"
    }
}

/// Solve `a * x = b` for symmetric positive definite `a`
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[[i, j]] * z[j];
        }
        z[i] = sum / l[[i, i]];
    }

    // Back substitution: L' x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for j in (i + 1)..n {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }

    Some(x)
}

/// Gaussian elimination with partial pivoting
fn gaussian_solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() < 1e-300 {
            return Err(MathError::Singular(format!(
                "Zero pivot in column {}",
                col
            )));
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }

        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[[i, j]] * x[j];
        }
        x[i] = sum / a[[i, i]];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::Singular(
            "Solution contains non-finite values".to_string(),
        ));
    }
    Ok(x)
}
