use crate::services::outcomes::OutcomeTally;
use crate::value_objects::bar_record::{BarAction, BarRecord};
use crate::value_objects::strategy_params::StrategyParameters;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    pub initial_capital: f64,
    pub final_portfolio_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub win_rate_pct: f64,
    pub buy_and_hold_final_value: f64,
    pub buy_and_hold_return_pct: f64,
    pub excess_return_pct: f64,
    pub bars_processed: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub win_count: usize,
    pub lose_count: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub elapsed_days: i64,
}

impl SummaryStatistics {
    /// Percentages, ratio and money fields at two decimals, for presentation only.
    pub fn rounded(&self) -> Self {
        Self {
            initial_capital: round2(self.initial_capital),
            final_portfolio_value: round2(self.final_portfolio_value),
            total_return_pct: round2(self.total_return_pct),
            annualized_return_pct: round2(self.annualized_return_pct),
            max_drawdown_pct: round2(self.max_drawdown_pct),
            sharpe_ratio: round2(self.sharpe_ratio),
            win_rate_pct: round2(self.win_rate_pct),
            buy_and_hold_final_value: round2(self.buy_and_hold_final_value),
            buy_and_hold_return_pct: round2(self.buy_and_hold_return_pct),
            excess_return_pct: round2(self.excess_return_pct),
            ..self.clone()
        }
    }
}

fn round2(value: f64) -> f64 {
    let scaled = (value * 100.0).round();
    if scaled.is_finite() {
        scaled / 100.0
    } else {
        value
    }
}

/// Derives the run summary from the record sequence alone.
pub fn summarize(
    records: &[BarRecord],
    params: &StrategyParameters,
    outcomes: &OutcomeTally,
) -> SummaryStatistics {
    let initial = params.initial_capital;
    let values: Vec<f64> = records.iter().map(|r| r.portfolio_value_after).collect();
    let final_value = values.last().copied().unwrap_or(initial);

    let start_date = records.first().map(|r| r.date);
    let end_date = records.last().map(|r| r.date);
    let elapsed_days = match (start_date, end_date) {
        (Some(start), Some(end)) => (end - start).num_days(),
        _ => 0,
    };

    let buy_and_hold_final_value = records
        .last()
        .map(|r| r.buy_and_hold_value)
        .unwrap_or(initial);

    let total_return = total_return_pct(initial, final_value);
    let buy_and_hold_return = total_return_pct(initial, buy_and_hold_final_value);

    SummaryStatistics {
        initial_capital: initial,
        final_portfolio_value: final_value,
        total_return_pct: total_return,
        annualized_return_pct: annualized_return_pct(initial, final_value, elapsed_days),
        max_drawdown_pct: max_drawdown_pct(&values),
        sharpe_ratio: sharpe_ratio(&daily_returns(&values)),
        win_rate_pct: win_rate_pct(outcomes.win_count(), outcomes.lose_count()),
        buy_and_hold_final_value,
        buy_and_hold_return_pct: buy_and_hold_return,
        excess_return_pct: total_return - buy_and_hold_return,
        bars_processed: records.len(),
        buy_count: records.iter().filter(|r| r.action == BarAction::Buy).count(),
        sell_count: records.iter().filter(|r| r.action == BarAction::Sell).count(),
        win_count: outcomes.win_count(),
        lose_count: outcomes.lose_count(),
        start_date,
        end_date,
        elapsed_days,
    }
}

pub fn total_return_pct(initial: f64, final_value: f64) -> f64 {
    (final_value - initial) / initial * 100.0
}

/// Compounded to a 365-day year; `0` when first and last bar share a date.
/// A non-positive terminal value is reported as a total loss. Growth too steep
/// to compound in `f64` saturates at `f64::MAX` so the summary stays valid JSON.
pub fn annualized_return_pct(initial: f64, final_value: f64, elapsed_days: i64) -> f64 {
    if elapsed_days <= 0 {
        return 0.0;
    }
    let growth = final_value / initial;
    if growth <= 0.0 {
        return -100.0;
    }
    let annualized = (growth.powf(CALENDAR_DAYS_PER_YEAR / elapsed_days as f64) - 1.0) * 100.0;
    if annualized.is_finite() {
        annualized
    } else {
        f64::MAX
    }
}

/// Largest decline from the running peak, in percent.
pub fn max_drawdown_pct(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0f64;
    for value in values {
        if *value > peak {
            peak = *value;
        }
        if peak > 0.0 {
            let drawdown = (peak - value) / peak * 100.0;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }
    max_drawdown
}

/// Simple returns between consecutive values; pairs with a non-positive base are skipped.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|pair| pair[0] > 0.0)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

/// `sqrt(252) * mean / sample std`; `0` for fewer than two returns or zero dispersion.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns
        .iter()
        .map(|ret| {
            let diff = ret - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);

    let std = var.sqrt();
    if std == 0.0 || !std.is_finite() {
        0.0
    } else {
        TRADING_DAYS_PER_YEAR.sqrt() * mean / std
    }
}

pub fn win_rate_pct(wins: usize, losses: usize) -> f64 {
    let total = wins + losses;
    if total == 0 {
        0.0
    } else {
        wins as f64 / total as f64 * 100.0
    }
}
