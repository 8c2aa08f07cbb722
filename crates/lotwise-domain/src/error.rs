//! Error taxonomy for a backtest run.

use thiserror::Error;

/// Every failure is terminal for the current run; nothing is retried or clamped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BacktestError {
    /// Empty series, ordering violation, or an inconsistent OHLC bar.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-positive capital, non-positive buy threshold, sell threshold not above buy, bad costs.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Raised by the data-acquisition side and passed through unchanged.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),
}

impl BacktestError {
    pub fn kind(&self) -> &'static str {
        match self {
            BacktestError::InvalidInput(_) => "invalid_input",
            BacktestError::InvalidParameters(_) => "invalid_parameters",
            BacktestError::DataUnavailable(_) => "data_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, BacktestError>;
