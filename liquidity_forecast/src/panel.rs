//! Dense per-bond daily volume panels
//!
//! One matrix per trade side, rows in bond-universe order and one column per
//! day index. Bonds and days are mapped to integer offsets once, so the
//! accumulation pass never looks rows up by label more than once per record.

use crate::data::{Side, TransactionRecord};
use crate::dates::DateIndexer;
use crate::error::{ForecastError, Result};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::HashMap;
use tracing::debug;

/// Summed volume per bond and day for one side
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePanel {
    side: Side,
    bonds: Vec<String>,
    index: HashMap<String, usize>,
    values: Array2<f64>,
}

impl VolumePanel {
    /// All-zero panel over `bonds` × `total_days`
    pub fn zeros(side: Side, bonds: &[String], total_days: usize) -> Result<Self> {
        let mut index = HashMap::with_capacity(bonds.len());
        for (row, isin) in bonds.iter().enumerate() {
            if index.insert(isin.clone(), row).is_some() {
                return Err(ForecastError::Schema(format!(
                    "Bond '{}' appears twice in the universe",
                    isin
                )));
            }
        }

        Ok(Self {
            side,
            bonds: bonds.to_vec(),
            index,
            values: Array2::zeros((bonds.len(), total_days)),
        })
    }

    /// Trade side of this panel
    pub fn side(&self) -> Side {
        self.side
    }

    /// Bonds in row order
    pub fn bonds(&self) -> &[String] {
        &self.bonds
    }

    /// Number of day columns
    pub fn total_days(&self) -> usize {
        self.values.ncols()
    }

    /// Underlying matrix, rows = bonds, column `d - 1` = day `d`
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Row offset of a bond
    pub fn row_index(&self, isin: &str) -> Option<usize> {
        self.index.get(isin).copied()
    }

    /// Daily volumes of a bond
    pub fn row(&self, isin: &str) -> Option<ArrayView1<f64>> {
        self.row_index(isin).map(|r| self.values.row(r))
    }

    /// Volume of a bond on a 1-based day
    pub fn value(&self, isin: &str, day: usize) -> Option<f64> {
        let row = self.row_index(isin)?;
        if day == 0 || day > self.total_days() {
            return None;
        }
        Some(self.values[[row, day - 1]])
    }

    /// Total volume of a bond over the whole panel
    pub fn row_total(&self, isin: &str) -> Option<f64> {
        self.row(isin).map(|r| r.sum())
    }

    /// Total volume of every bond, in row order
    pub fn row_totals(&self) -> Array1<f64> {
        self.values.sum_axis(Axis(1))
    }

    /// Volumes of every bond on a 1-based day
    pub fn day_column(&self, day: usize) -> Option<ArrayView1<f64>> {
        if day == 0 || day > self.total_days() {
            return None;
        }
        Some(self.values.column(day - 1))
    }

    /// Columns for days `first..=last` (1-based, inclusive)
    pub fn days(&self, first: usize, last: usize) -> Result<ArrayView2<f64>> {
        if first == 0 || first > last || last > self.total_days() {
            return Err(ForecastError::Data(format!(
                "Day range {}..={} is outside 1..={}",
                first,
                last,
                self.total_days()
            )));
        }
        Ok(self.values.slice(s![.., first - 1..last]))
    }

    fn add(&mut self, row: usize, day: usize, volume: f64) {
        self.values[[row, day - 1]] += volume;
    }
}

/// Buy and sell panels over the same universe and days
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePanels {
    /// Buy-side volumes
    pub buy: VolumePanel,
    /// Sell-side volumes
    pub sell: VolumePanel,
}

impl VolumePanels {
    /// Panel for a side (None for [`Side::Other`])
    pub fn side(&self, side: Side) -> Option<&VolumePanel> {
        match side {
            Side::Buy => Some(&self.buy),
            Side::Sell => Some(&self.sell),
            Side::Other => None,
        }
    }
}

/// Aggregates transactions into [`VolumePanels`]
#[derive(Debug, Clone)]
pub struct VolumePanelBuilder<'a> {
    universe: &'a [String],
    indexer: DateIndexer,
}

impl<'a> VolumePanelBuilder<'a> {
    /// Create a builder for a universe and an indexed day span
    pub fn new(universe: &'a [String], indexer: DateIndexer) -> Self {
        Self { universe, indexer }
    }

    /// Accumulate every record into the side-matched panel
    ///
    /// Records with an unknown side or a bond outside the universe are
    /// skipped. Dates outside the indexer range are an error.
    pub fn build(&self, records: &[TransactionRecord]) -> Result<VolumePanels> {
        let total_days = self.indexer.total_days();
        let mut buy = VolumePanel::zeros(Side::Buy, self.universe, total_days)?;
        let mut sell = VolumePanel::zeros(Side::Sell, self.universe, total_days)?;

        let mut unknown_bond = 0usize;
        let mut other_side = 0usize;

        for record in records {
            let panel = match record.side {
                Side::Buy => &mut buy,
                Side::Sell => &mut sell,
                Side::Other => {
                    other_side += 1;
                    continue;
                }
            };

            let row = match panel.row_index(&record.isin) {
                Some(row) => row,
                None => {
                    unknown_bond += 1;
                    continue;
                }
            };

            let day = self.indexer.day_index(record.date)?;
            panel.add(row, day, record.volume);
        }

        debug!(
            "Panels built: {} bonds x {} days, {} records without metadata, {} with unknown side",
            self.universe.len(),
            total_days,
            unknown_bond,
            other_side
        );

        Ok(VolumePanels { buy, sell })
    }
}
