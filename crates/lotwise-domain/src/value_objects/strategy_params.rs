use crate::error::{BacktestError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOT_SIZE: u64 = 100;
pub const DEFAULT_BUY_FEE_RATE: f64 = 0.0003;
pub const DEFAULT_SELL_FEE_RATE: f64 = 0.0003;
pub const DEFAULT_SELL_TAX_RATE: f64 = 0.001;

/// Threshold rule plus the fixed proportional cost model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub initial_capital: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub lot_size: u64,
    pub buy_fee_rate: f64,
    pub sell_fee_rate: f64,
    pub sell_tax_rate: f64,
}

impl StrategyParameters {
    /// Thresholds and capital with the default A-share cost model.
    pub fn new(initial_capital: f64, buy_threshold: f64, sell_threshold: f64) -> Self {
        Self {
            initial_capital,
            buy_threshold,
            sell_threshold,
            lot_size: DEFAULT_LOT_SIZE,
            buy_fee_rate: DEFAULT_BUY_FEE_RATE,
            sell_fee_rate: DEFAULT_SELL_FEE_RATE,
            sell_tax_rate: DEFAULT_SELL_TAX_RATE,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid(format!(
                "initial_capital must be finite and > 0 (got {})",
                self.initial_capital
            )));
        }
        if !self.buy_threshold.is_finite() || self.buy_threshold <= 0.0 {
            return Err(invalid(format!(
                "buy_threshold must be finite and > 0 (got {})",
                self.buy_threshold
            )));
        }
        if !self.sell_threshold.is_finite() || self.sell_threshold <= self.buy_threshold {
            return Err(invalid(format!(
                "sell_threshold must be finite and > buy_threshold (buy={}, sell={})",
                self.buy_threshold, self.sell_threshold
            )));
        }
        if self.lot_size == 0 {
            return Err(invalid("lot_size must be > 0".to_string()));
        }
        for (name, rate) in [
            ("buy_fee_rate", self.buy_fee_rate),
            ("sell_fee_rate", self.sell_fee_rate),
            ("sell_tax_rate", self.sell_tax_rate),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(invalid(format!("{name} must be finite and >= 0 (got {rate})")));
            }
        }
        if self.buy_fee_rate >= 1.0 {
            return Err(invalid("buy_fee_rate must be < 1".to_string()));
        }
        if self.sell_fee_rate + self.sell_tax_rate >= 1.0 {
            return Err(invalid(
                "sell_fee_rate + sell_tax_rate must be < 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lot_size_f64(&self) -> f64 {
        self.lot_size as f64
    }

    /// Fraction of gross sale proceeds that reaches cash.
    pub fn sell_net_factor(&self) -> f64 {
        1.0 - self.sell_fee_rate - self.sell_tax_rate
    }
}

fn invalid(message: String) -> BacktestError {
    BacktestError::InvalidParameters(message)
}
