//! End-to-end forecast run
//!
//! Stages run strictly in order and any error aborts the run before a
//! single forecast is produced:
//!
//! 1. day indexing over the transaction dates
//! 2. buy and sell volume panels over the metadata universe
//! 3. static feature decoding
//! 4. lagged train/test matrices per side
//! 5. ensemble fit and prediction per side
//! 6. baseline blending

use crate::blend::BaselineBlender;
use crate::config::ForecastConfig;
use crate::data::{ForecastRecord, MetadataTable, TransactionFeed};
use crate::dates::DateIndexer;
use crate::ensemble::EnsembleForecaster;
use crate::error::Result;
use crate::panel::VolumePanelBuilder;
use crate::static_features::StaticFeatureTable;
use crate::supervised::SupervisedMatrixBuilder;
use tracing::{debug, info};

/// Runs the whole forecast for one pair of input feeds
#[derive(Debug, Clone, Default)]
pub struct LiquidityPipeline {
    config: ForecastConfig,
}

impl LiquidityPipeline {
    /// Create a pipeline; the configuration is validated when it runs
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast next-day buy and sell volume for every bond in `metadata`
    pub fn run(
        &self,
        transactions: &TransactionFeed,
        metadata: &MetadataTable,
    ) -> Result<Vec<ForecastRecord>> {
        self.config.validate()?;

        let indexer = DateIndexer::from_dates(transactions.dates())?;
        info!(
            "Indexed {} transactions over {} days from {}",
            transactions.len(),
            indexer.total_days(),
            indexer.min_date()
        );

        let universe = metadata.universe(&self.config.features.id_column)?;
        let panels = VolumePanelBuilder::new(&universe, indexer).build(transactions.records())?;
        info!("Built volume panels for {} bonds", universe.len());

        let features = StaticFeatureTable::build(metadata, &universe, &self.config.features)?;
        debug!("Static features: {:?}", features.columns());

        let builder = SupervisedMatrixBuilder::new(&features);
        let buy_matrices = builder.build(&panels.buy)?;
        let sell_matrices = builder.build(&panels.sell)?;
        info!(
            "Built supervised matrices with {} feature columns",
            buy_matrices.columns.len()
        );

        let forecaster = EnsembleForecaster::new(&self.config);
        let buy = forecaster.fit_predict(&buy_matrices)?;
        let sell = forecaster.fit_predict(&sell_matrices)?;

        let forecasts =
            BaselineBlender::new(&panels.buy, &panels.sell).blend(&universe, &buy, &sell)?;
        info!("Produced {} forecasts", forecasts.len());

        Ok(forecasts)
    }
}
