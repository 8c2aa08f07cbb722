use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Lose,
}

/// A single fill. `outcome` is set only on sells that closed a tracked buy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub side: Side,
    pub units: u64,
    pub price: f64,
    pub notional: f64,
    pub fee: f64,
    pub tax: f64,
    pub cash_after: f64,
    pub outcome: Option<TradeOutcome>,
}
