//! # Bond Liquidity
//!
//! Workspace facade over the liquidity forecasting crates.
//!
//! - [`math`]: the regressors (`liquidity_math`)
//! - [`forecast`]: feeds, panels, features, ensemble and blend (`liquidity_forecast`)
//!
//! ## Example
//!
//! ```
//! use bond_liquidity::forecast::blend::blend_value;
//!
//! // (baseline + 3 * member sum) / 4, truncated
//! assert_eq!(blend_value(10.0, 30.0), 25);
//! ```

pub use liquidity_forecast as forecast;
pub use liquidity_math as math;

pub use liquidity_forecast::{ForecastConfig, ForecastError, ForecastRecord, LiquidityPipeline};
