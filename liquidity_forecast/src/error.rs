//! Error types for the liquidity_forecast crate

use liquidity_math::MathError;
use thiserror::Error;

/// Custom error types for the liquidity_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Malformed date or record field in an input feed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Metadata does not have the expected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// A regressor rejected its training input
    #[error("Fit error: {0}")]
    Fit(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    Data(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from configuration decoding
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::Fit(err.to_string())
    }
}
