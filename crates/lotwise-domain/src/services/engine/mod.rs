//! Threshold backtest: a left fold over the bar sequence with [`SimulationState`]
//! as the accumulator.

mod state;

pub use state::{SimulationState, Step};

use crate::error::{BacktestError, Result};
use crate::services::baseline::BuyAndHold;
use crate::services::metrics::{summarize, SummaryStatistics};
use crate::value_objects::bar_record::BarRecord;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::price_series::PriceSeries;
use crate::value_objects::strategy_params::StrategyParameters;
use crate::value_objects::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestOutcome {
    pub records: Vec<BarRecord>,
    pub trades: Vec<Trade>,
    pub summary: SummaryStatistics,
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    params: StrategyParameters,
}

impl BacktestEngine {
    pub fn new(params: StrategyParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Errors only when capital outgrows the unit counter at the bar prices.
    pub fn run(&self, series: &PriceSeries) -> Result<BacktestOutcome> {
        let baseline = BuyAndHold::at_first_close(
            self.params.initial_capital,
            series.first().close,
            self.params.lot_size,
        )?;

        let seed = (
            SimulationState::new(self.params.initial_capital),
            Vec::with_capacity(series.len()),
            Vec::new(),
        );
        let (state, records, trades) =
            series
                .bars()
                .iter()
                .try_fold(seed, |(state, mut records, mut trades), bar| {
                    let step = state.step(bar, &self.params, &baseline)?;
                    records.push(step.record);
                    trades.extend(step.trade);
                    Ok::<_, BacktestError>((step.state, records, trades))
                })?;

        let summary = summarize(&records, &self.params, state.outcomes());
        Ok(BacktestOutcome {
            records,
            trades,
            summary,
        })
    }
}

/// Validates parameters, then the series, then runs. Nothing is simulated if
/// either check fails; parameter errors take precedence.
pub fn run(bars: Vec<PriceBar>, params: StrategyParameters) -> Result<BacktestOutcome> {
    let engine = BacktestEngine::new(params)?;
    let series = PriceSeries::new(bars)?;
    engine.run(&series)
}
