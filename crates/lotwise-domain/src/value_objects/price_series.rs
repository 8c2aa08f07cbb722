use crate::error::{BacktestError, Result};
use crate::value_objects::price_bar::PriceBar;
use chrono::NaiveDate;

/// Ascending, non-empty, validated sequence of daily bars.
///
/// Construction is the only validation point; a `PriceSeries` in hand is always
/// safe to feed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(BacktestError::InvalidInput(
                "price series is empty".to_string(),
            ));
        }

        for (idx, bar) in bars.iter().enumerate() {
            if !bar.prices_positive() {
                return Err(BacktestError::InvalidInput(format!(
                    "bar {idx} ({}) has a non-positive or non-finite price",
                    bar.date
                )));
            }
            if !bar.ohlc_consistent() {
                return Err(BacktestError::InvalidInput(format!(
                    "bar {idx} ({}) violates low <= open,close <= high (o={} h={} l={} c={})",
                    bar.date, bar.open, bar.high, bar.low, bar.close
                )));
            }
            if !bar.volume.is_finite() || bar.volume < 0.0 {
                return Err(BacktestError::InvalidInput(format!(
                    "bar {idx} ({}) has a negative or non-finite volume",
                    bar.date
                )));
            }
        }

        if let Some(pos) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(BacktestError::InvalidInput(format!(
                "dates must be strictly increasing: bar {} ({}) follows {}",
                pos + 1,
                bars[pos + 1].date,
                bars[pos].date
            )));
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &PriceBar {
        &self.bars[0]
    }

    pub fn last(&self) -> &PriceBar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn start_date(&self) -> NaiveDate {
        self.first().date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.last().date
    }
}
