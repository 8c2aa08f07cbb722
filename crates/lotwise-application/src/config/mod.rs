use crate::acquisition::MAX_SESSIONS;
use chrono::NaiveDate;
use lotwise_domain::value_objects::strategy_params::{
    StrategyParameters, DEFAULT_BUY_FEE_RATE, DEFAULT_LOT_SIZE, DEFAULT_SELL_FEE_RATE,
    DEFAULT_SELL_TAX_RATE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub costs: CostsConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub symbol: String,
    /// Analysis window, in trading sessions.
    pub sessions: usize,
    /// Last calendar day of the window; today when absent.
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostsConfig {
    pub buy_fee_rate: f64,
    pub sell_fee_rate: f64,
    pub sell_tax_rate: f64,
    pub lot_size: u64,
}

impl Default for CostsConfig {
    fn default() -> Self {
        Self {
            buy_fee_rate: DEFAULT_BUY_FEE_RATE,
            sell_fee_rate: DEFAULT_SELL_FEE_RATE,
            sell_tax_rate: DEFAULT_SELL_TAX_RATE,
            lot_size: DEFAULT_LOT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// CSV path template; `{symbol}` is replaced by `run.symbol`.
    pub bars_csv: String,
    pub out_dir: String,
}

impl Config {
    pub fn strategy_parameters(&self) -> StrategyParameters {
        StrategyParameters {
            initial_capital: self.run.initial_capital,
            buy_threshold: self.strategy.buy_threshold,
            sell_threshold: self.strategy.sell_threshold,
            lot_size: self.costs.lot_size,
            buy_fee_rate: self.costs.buy_fee_rate,
            sell_fee_rate: self.costs.sell_fee_rate,
            sell_tax_rate: self.costs.sell_tax_rate,
        }
    }

    pub fn end_date(&self) -> NaiveDate {
        self.run
            .end_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    load_config_with_source(path).map(|(config, _)| config)
}

/// Parsed config plus the raw TOML, which is snapshotted next to run artifacts.
pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = parse_config(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    let config: Config = toml::from_str(contents).map_err(|err| err.to_string())?;
    if config.run.sessions == 0 || config.run.sessions > MAX_SESSIONS {
        return Err(format!(
            "run.sessions must be between 1 and {} (got {})",
            MAX_SESSIONS, config.run.sessions
        ));
    }
    Ok(config)
}
