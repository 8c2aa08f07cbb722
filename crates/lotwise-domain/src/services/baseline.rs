use crate::error::{BacktestError, Result};

/// Units in the largest whole-lot block `budget` affords at `price`.
///
/// Fails when the unit count does not fit the `u64` position counter.
pub fn affordable_units(budget: f64, price: f64, lot_size: u64) -> Result<u64> {
    let lot_cost = price * lot_size as f64;
    if lot_cost <= 0.0 || budget <= 0.0 {
        return Ok(0);
    }
    let lots = (budget / lot_cost).floor();
    if lots >= u64::MAX as f64 {
        return Err(position_overflow(budget, price, lot_size));
    }
    (lots as u64)
        .checked_mul(lot_size)
        .ok_or_else(|| position_overflow(budget, price, lot_size))
}

pub(crate) fn position_overflow(budget: f64, price: f64, lot_size: u64) -> BacktestError {
    BacktestError::InvalidParameters(format!(
        "position size overflows at price {price} (cash {budget}, lot_size {lot_size}); lower initial_capital"
    ))
}

/// Buy the maximum whole-lot position at the first close and hold it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyAndHold {
    pub units: u64,
    pub residual_cash: f64,
}

impl BuyAndHold {
    pub fn at_first_close(initial_capital: f64, first_close: f64, lot_size: u64) -> Result<Self> {
        let units = affordable_units(initial_capital, first_close, lot_size)?;
        Ok(Self {
            units,
            residual_cash: initial_capital - units as f64 * first_close,
        })
    }

    pub fn value_at(&self, close: f64) -> f64 {
        self.residual_cash + self.units as f64 * close
    }
}
