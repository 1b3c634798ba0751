//! Lagged supervised-learning matrices
//!
//! With `N` panel days, training rows use days `1..N-1` to predict day `N`
//! and test rows use days `2..N` to predict day `N+1`. Lag columns are named
//! by their distance to the target day (`lag_1` is the day before), so both
//! matrices carry the same column list.

use crate::data::Side;
use crate::error::{ForecastError, Result};
use crate::panel::VolumePanel;
use crate::static_features::StaticFeatureTable;
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

/// Training and test matrices for one side
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedMatrices {
    /// Trade side of the panel the matrices come from
    pub side: Side,
    /// Bonds in row order
    pub bonds: Vec<String>,
    /// Feature names shared by `train_x` and `test_x`
    pub columns: Vec<String>,
    /// Static features ⧺ days `1..N-1`
    pub train_x: Array2<f64>,
    /// Day `N`
    pub train_y: Array1<f64>,
    /// Static features ⧺ days `2..N`
    pub test_x: Array2<f64>,
}

/// Joins static features with lagged panel windows
#[derive(Debug, Clone, Copy)]
pub struct SupervisedMatrixBuilder<'a> {
    features: &'a StaticFeatureTable,
}

impl<'a> SupervisedMatrixBuilder<'a> {
    /// Create a builder over a static feature table
    pub fn new(features: &'a StaticFeatureTable) -> Self {
        Self { features }
    }

    /// Build the matrices for one side's panel
    pub fn build(&self, panel: &VolumePanel) -> Result<SupervisedMatrices> {
        let n = panel.total_days();
        if n < 2 {
            return Err(ForecastError::Data(format!(
                "Need at least 2 days of history to build lag windows, have {}",
                n
            )));
        }

        let volumes = self.aligned_volumes(panel);
        let statics = self.features.values().view();

        let train_columns = self.column_names(1, n - 1, n);
        let test_columns = self.column_names(2, n, n + 1);

        let mut train_x = join(statics, volumes.slice(ndarray::s![.., 0..n - 1]))?;
        let mut test_x = join(statics, volumes.slice(ndarray::s![.., 1..n]))?;
        check_alignment(&train_columns, &test_columns, &train_x, &test_x)?;
        let mut train_y = volumes.column(n - 1).to_owned();

        fill_non_finite(&mut train_x);
        fill_non_finite(&mut test_x);
        train_y.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });

        Ok(SupervisedMatrices {
            side: panel.side(),
            bonds: self.features.bonds().to_vec(),
            columns: train_columns,
            train_x,
            train_y,
            test_x,
        })
    }

    /// Panel rows reordered to the static table's bonds; missing bonds are zero
    fn aligned_volumes(&self, panel: &VolumePanel) -> Array2<f64> {
        let bonds = self.features.bonds();
        let mut aligned = Array2::zeros((bonds.len(), panel.total_days()));
        for (r, isin) in bonds.iter().enumerate() {
            if let Some(row) = panel.row(isin) {
                aligned.row_mut(r).assign(&row);
            }
        }
        aligned
    }

    fn column_names(&self, first_day: usize, last_day: usize, target_day: usize) -> Vec<String> {
        self.features
            .columns()
            .iter()
            .cloned()
            .chain((first_day..=last_day).map(|day| format!("lag_{}", target_day - day)))
            .collect()
    }
}

fn join<'a>(statics: ArrayView2<'a, f64>, lags: ArrayView2<'a, f64>) -> Result<Array2<f64>> {
    concatenate(Axis(1), &[statics, lags])
        .map_err(|e| ForecastError::Data(format!("Cannot join static and lag columns: {}", e)))
}

/// Both matrices must carry the same named columns, one per matrix column
fn check_alignment(
    train_columns: &[String],
    test_columns: &[String],
    train_x: &Array2<f64>,
    test_x: &Array2<f64>,
) -> Result<()> {
    if train_columns != test_columns {
        return Err(ForecastError::Schema(
            "Train and test feature columns are misaligned".to_string(),
        ));
    }
    if train_x.ncols() != train_columns.len() || test_x.ncols() != train_columns.len() {
        return Err(ForecastError::Schema(format!(
            "Feature matrices have {} train and {} test columns for {} names",
            train_x.ncols(),
            test_x.ncols(),
            train_columns.len()
        )));
    }
    Ok(())
}

fn fill_non_finite(x: &mut Array2<f64>) {
    x.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
}
