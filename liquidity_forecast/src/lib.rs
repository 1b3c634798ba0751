//! # Liquidity Forecast
//!
//! Next-day buy and sell volume forecasting for a universe of bonds.
//!
//! ## Features
//!
//! - Transaction and bond metadata feeds (CSV)
//! - Dense per-bond daily volume panels for each trade side
//! - Categorical decoding of static bond attributes
//! - Lagged supervised matrices shifted by one day for train and test
//! - Gradient boosting, random forest and linear members fitted per side
//! - Fixed-weight blend with a per-bond historical baseline
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use liquidity_forecast::data::{write_forecasts, MetadataTable, TransactionFeed};
//! use liquidity_forecast::{ForecastConfig, LiquidityPipeline};
//!
//! let transactions = TransactionFeed::from_csv("dataset.csv")?;
//! let metadata = MetadataTable::from_csv("ML_Bond_metadata.csv")?;
//!
//! let pipeline = LiquidityPipeline::new(ForecastConfig::default());
//! let forecasts = pipeline.run(&transactions, &metadata)?;
//!
//! write_forecasts("output_final.csv", &forecasts)?;
//! # Ok::<(), liquidity_forecast::ForecastError>(())
//! ```

pub mod blend;
pub mod config;
pub mod data;
pub mod dates;
pub mod ensemble;
pub mod error;
pub mod panel;
pub mod pipeline;
pub mod static_features;
pub mod supervised;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::data::{ForecastRecord, MetadataTable, Side, TransactionFeed, TransactionRecord};
pub use crate::ensemble::{EnsembleForecaster, ModelKind, SidePredictions};
pub use crate::error::{ForecastError, Result};
pub use crate::pipeline::LiquidityPipeline;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
