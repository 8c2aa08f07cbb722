use crate::error::Result;
use crate::services::baseline::{affordable_units, position_overflow, BuyAndHold};
use crate::services::outcomes::OutcomeTally;
use crate::value_objects::bar_record::{BarAction, BarRecord};
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::strategy_params::StrategyParameters;
use crate::value_objects::trade::{Side, Trade};

/// Accumulator of the fold. Owned by one run only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationState {
    cash: f64,
    position_units: u64,
    outcomes: OutcomeTally,
}

/// Result of applying one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: SimulationState,
    pub record: BarRecord,
    pub trade: Option<Trade>,
}

impl SimulationState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position_units: 0,
            outcomes: OutcomeTally::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position_units(&self) -> u64 {
        self.position_units
    }

    pub fn outcomes(&self) -> &OutcomeTally {
        &self.outcomes
    }

    /// Buy is checked first; the sell branch is only reached when no buy fired.
    /// Fails only when the position would not fit the unit counter.
    pub fn step(
        mut self,
        bar: &PriceBar,
        params: &StrategyParameters,
        baseline: &BuyAndHold,
    ) -> Result<Step> {
        let lot = params.lot_size_f64();
        let mut trade = None;

        let action = if bar.low <= params.buy_threshold && self.cash >= bar.low * lot {
            let units = affordable_units(self.cash, bar.low, params.lot_size)?;
            let notional = units as f64 * bar.low;

            self.position_units = self
                .position_units
                .checked_add(units)
                .ok_or_else(|| position_overflow(self.cash, bar.low, params.lot_size))?;
            self.cash -= units as f64 * bar.low * (1.0 + params.buy_fee_rate);
            self.outcomes.on_buy(bar.low);

            trade = Some(Trade {
                date: bar.date,
                side: Side::Buy,
                units,
                price: bar.low,
                notional,
                fee: notional * params.buy_fee_rate,
                tax: 0.0,
                cash_after: self.cash,
                outcome: None,
            });
            BarAction::Buy
        } else if bar.high >= params.sell_threshold && self.position_units > 0 {
            let units = self.position_units;
            let notional = units as f64 * bar.high;

            self.cash += units as f64 * bar.high * params.sell_net_factor();
            self.position_units = 0;
            let outcome = self.outcomes.on_sell(bar.high);

            trade = Some(Trade {
                date: bar.date,
                side: Side::Sell,
                units,
                price: bar.high,
                notional,
                fee: notional * params.sell_fee_rate,
                tax: notional * params.sell_tax_rate,
                cash_after: self.cash,
                outcome,
            });
            BarAction::Sell
        } else {
            BarAction::None
        };

        let action_price = match action {
            BarAction::Buy => Some(bar.low),
            BarAction::Sell => Some(bar.high),
            BarAction::None => None,
        };

        let record = BarRecord {
            date: bar.date,
            close: bar.close,
            cash_after: self.cash,
            position_after: self.position_units,
            portfolio_value_after: self.cash + self.position_units as f64 * bar.close,
            action,
            action_price,
            buy_and_hold_value: baseline.value_at(bar.close),
        };

        Ok(Step {
            state: self,
            record,
            trade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SimulationState;
    use crate::services::baseline::BuyAndHold;
    use crate::value_objects::bar_record::BarAction;
    use crate::value_objects::price_bar::PriceBar;
    use crate::value_objects::strategy_params::StrategyParameters;
    use chrono::NaiveDate;

    fn bar(low: f64, close: f64, high: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 5, 6).expect("valid date"),
            open: close,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn buy_spends_whole_lots_only() {
        let params = StrategyParameters::new(10_000.0, 5.0, 6.0);
        let baseline = BuyAndHold::at_first_close(10_000.0, 4.9, 100).expect("baseline");
        let step = SimulationState::new(10_000.0)
            .step(&bar(4.9, 5.0, 5.1), &params, &baseline)
            .expect("step");

        // 10_000 / 490 = 20.4 lots
        assert_eq!(step.record.action, BarAction::Buy);
        assert_eq!(step.state.position_units(), 2_000);
        assert_eq!(step.state.position_units() % params.lot_size, 0);
        let expected_cash = 10_000.0 - 2_000.0 * 4.9 * 1.0003;
        assert!((step.state.cash() - expected_cash).abs() < 1e-9);
        assert_eq!(step.record.action_price, Some(4.9));
    }

    #[test]
    fn sell_liquidates_and_clears_prior_buy() {
        let params = StrategyParameters::new(1_000.0, 5.0, 6.0);
        let baseline = BuyAndHold::at_first_close(1_000.0, 5.0, 100).expect("baseline");
        let bought = SimulationState::new(1_000.0)
            .step(&bar(5.0, 5.0, 5.0), &params, &baseline)
            .expect("buy");
        let sold = bought
            .state
            .step(&bar(5.5, 5.8, 6.2), &params, &baseline)
            .expect("sell");

        assert_eq!(sold.record.action, BarAction::Sell);
        assert_eq!(sold.state.position_units(), 0);
        assert_eq!(sold.state.outcomes().prior_buy_price(), None);
        assert_eq!(sold.state.outcomes().win_count(), 1);
        assert_eq!(sold.record.portfolio_value_after, sold.state.cash());
    }

    #[test]
    fn no_action_carries_state_forward() {
        let params = StrategyParameters::new(1_000.0, 5.0, 6.0);
        let baseline = BuyAndHold::at_first_close(1_000.0, 5.5, 100).expect("baseline");
        let start = SimulationState::new(1_000.0);
        let step = start
            .step(&bar(5.4, 5.5, 5.9), &params, &baseline)
            .expect("step");

        assert_eq!(step.record.action, BarAction::None);
        assert_eq!(step.record.action_price, None);
        assert_eq!(step.state, start);
        assert!(step.trade.is_none());
    }
}
