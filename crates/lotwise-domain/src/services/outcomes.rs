use crate::value_objects::bar_record::{BarAction, BarRecord};
use crate::value_objects::trade::TradeOutcome;

/// Win/lose attribution for paired buy -> sell trades.
///
/// A buy remembers its price, overwriting any earlier unresolved buy. A sell
/// resolves against the remembered price (win when strictly higher) and clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutcomeTally {
    prior_buy_price: Option<f64>,
    wins: usize,
    losses: usize,
}

impl OutcomeTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_buy(&mut self, price: f64) {
        self.prior_buy_price = Some(price);
    }

    pub fn on_sell(&mut self, price: f64) -> Option<TradeOutcome> {
        let buy_price = self.prior_buy_price.take()?;
        if price > buy_price {
            self.wins += 1;
            Some(TradeOutcome::Win)
        } else {
            self.losses += 1;
            Some(TradeOutcome::Lose)
        }
    }

    /// Replays attribution over a finished record sequence.
    pub fn from_records(records: &[BarRecord]) -> Self {
        let mut tally = Self::new();
        for record in records {
            match (record.action, record.action_price) {
                (BarAction::Buy, Some(price)) => tally.on_buy(price),
                (BarAction::Sell, Some(price)) => {
                    tally.on_sell(price);
                }
                _ => {}
            }
        }
        tally
    }

    pub fn prior_buy_price(&self) -> Option<f64> {
        self.prior_buy_price
    }

    pub fn win_count(&self) -> usize {
        self.wins
    }

    pub fn lose_count(&self) -> usize {
        self.losses
    }

    pub fn paired_trades(&self) -> usize {
        self.wins + self.losses
    }
}

#[cfg(test)]
mod tests {
    use super::OutcomeTally;
    use crate::value_objects::trade::TradeOutcome;

    #[test]
    fn sell_without_buy_is_unpaired() {
        let mut tally = OutcomeTally::new();
        assert_eq!(tally.on_sell(10.0), None);
        assert_eq!(tally.paired_trades(), 0);
    }

    #[test]
    fn equal_price_counts_as_lose() {
        let mut tally = OutcomeTally::new();
        tally.on_buy(10.0);
        assert_eq!(tally.on_sell(10.0), Some(TradeOutcome::Lose));
        tally.on_buy(9.0);
        assert_eq!(tally.on_sell(9.5), Some(TradeOutcome::Win));
        assert_eq!(tally.win_count(), 1);
        assert_eq!(tally.lose_count(), 1);
        assert_eq!(tally.prior_buy_price(), None);
    }

    #[test]
    fn later_buy_overwrites_unresolved_one() {
        let mut tally = OutcomeTally::new();
        tally.on_buy(5.0);
        tally.on_buy(12.0);
        assert_eq!(tally.on_sell(11.0), Some(TradeOutcome::Lose));
        assert_eq!(tally.paired_trades(), 1);
    }
}
