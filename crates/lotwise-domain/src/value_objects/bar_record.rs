use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarAction {
    None,
    Buy,
    Sell,
}

impl BarAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarAction::None => "none",
            BarAction::Buy => "buy",
            BarAction::Sell => "sell",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "none" => Some(BarAction::None),
            "buy" => Some(BarAction::Buy),
            "sell" => Some(BarAction::Sell),
            _ => None,
        }
    }
}

/// State after one bar has been processed. `action_price` is the bar's low for
/// a buy and its high for a sell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub cash_after: f64,
    pub position_after: u64,
    pub portfolio_value_after: f64,
    pub action: BarAction,
    pub action_price: Option<f64>,
    pub buy_and_hold_value: f64,
}
