//! Baseline blending of the ensemble output
//!
//! `final = (BASELINE_WEIGHT * baseline + ENSEMBLE_WEIGHT * (gbm + rf + linear)) / BLEND_NORMALIZER`
//! where `baseline` is the bond's panel total over [`BASELINE_DIVISOR`]
//! days. The result is clamped at zero and truncated to a whole volume.

use crate::data::ForecastRecord;
use crate::ensemble::SidePredictions;
use crate::error::{ForecastError, Result};
use crate::panel::VolumePanel;
use ndarray::Array1;

/// Days the panel total is spread over for the baseline
pub const BASELINE_DIVISOR: f64 = 30.0;

/// Weight of the baseline term
pub const BASELINE_WEIGHT: f64 = 1.0;

/// Weight of the summed ensemble predictions
pub const ENSEMBLE_WEIGHT: f64 = 3.0;

/// Divisor applied to the weighted sum
pub const BLEND_NORMALIZER: f64 = 4.0;

/// Baseline per bond in `bonds` order; bonds absent from the panel get 0
pub fn baseline(panel: &VolumePanel, bonds: &[String]) -> Array1<f64> {
    bonds
        .iter()
        .map(|isin| panel.row_total(isin).unwrap_or(0.0) / BASELINE_DIVISOR)
        .collect()
}

/// Blend one bond's baseline with its summed member predictions
pub fn blend_value(baseline: f64, member_sum: f64) -> u64 {
    let blended = (BASELINE_WEIGHT * baseline + ENSEMBLE_WEIGHT * member_sum) / BLEND_NORMALIZER;
    // NaN and negatives both land on 0; `as` truncates toward zero
    blended.max(0.0) as u64
}

/// Combines per-side baselines and ensemble predictions into forecasts
#[derive(Debug, Clone, Copy)]
pub struct BaselineBlender<'a> {
    buy_panel: &'a VolumePanel,
    sell_panel: &'a VolumePanel,
}

impl<'a> BaselineBlender<'a> {
    /// Create a blender over the buy and sell panels
    pub fn new(buy_panel: &'a VolumePanel, sell_panel: &'a VolumePanel) -> Self {
        Self {
            buy_panel,
            sell_panel,
        }
    }

    /// One forecast per bond, in `bonds` order
    pub fn blend(
        &self,
        bonds: &[String],
        buy: &SidePredictions,
        sell: &SidePredictions,
    ) -> Result<Vec<ForecastRecord>> {
        for (name, predictions) in [("buy", buy), ("sell", sell)] {
            if predictions.len() != bonds.len() {
                return Err(ForecastError::Data(format!(
                    "{} predictions cover {} bonds, expected {}",
                    name,
                    predictions.len(),
                    bonds.len()
                )));
            }
        }

        let buy_baseline = baseline(self.buy_panel, bonds);
        let sell_baseline = baseline(self.sell_panel, bonds);
        let buy_sum = buy.member_sum();
        let sell_sum = sell.member_sum();

        Ok(bonds
            .iter()
            .enumerate()
            .map(|(i, isin)| ForecastRecord {
                isin: isin.clone(),
                buy_volume: blend_value(buy_baseline[i], buy_sum[i]),
                sell_volume: blend_value(sell_baseline[i], sell_sum[i]),
            })
            .collect())
    }
}
