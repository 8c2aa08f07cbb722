use crate::config::{parse_config, Config};
use lotwise_domain::repositories::artifacts::ArtifactReader;
use lotwise_domain::services::metrics::{summarize, SummaryStatistics};
use lotwise_domain::services::outcomes::OutcomeTally;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info_span;

const RELATIVE_TOLERANCE: f64 = 1e-9;

pub struct GenerateReportResult {
    pub input_dir: PathBuf,
    pub run_id: String,
    pub summary: SummaryStatistics,
    pub persisted_summary: Option<String>,
    /// `None` when the run directory has no `summary.json`.
    pub matches_persisted: Option<bool>,
}

/// Recomputes a run's statistics from `bars.csv` and the `config.toml`
/// snapshot, and compares them with the persisted `summary.json`.
pub fn generate_report(
    input_dir: &Path,
    reader: &dyn ArtifactReader,
) -> Result<GenerateReportResult, String> {
    let _span = info_span!("generate_report", input_dir = %input_dir.display()).entered();

    let stage_start = Instant::now();
    let bars_path = input_dir.join("bars.csv");
    let config_path = input_dir.join("config.toml");
    let summary_path = input_dir.join("summary.json");

    if !reader.exists(&bars_path) {
        return Err(format!("missing bars.csv in {}", input_dir.display()));
    }
    let config = match reader.read_config_snapshot_toml(&config_path)? {
        Some(raw) => load_config_from_str(&raw)?,
        None => return Err(format!("missing config.toml in {}", input_dir.display())),
    };

    let records = reader.read_bars_csv(&bars_path)?;
    let tally = OutcomeTally::from_records(&records);
    let summary = summarize(&records, &config.strategy_parameters(), &tally);
    metrics::histogram!("lotwise.report.generate_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::gauge!("lotwise.report.bars_processed").set(summary.bars_processed as f64);

    let persisted_summary = if reader.exists(&summary_path) {
        Some(reader.read_text(&summary_path)?)
    } else {
        None
    };
    let matches_persisted = match persisted_summary.as_deref() {
        Some(raw) => Some(summaries_agree(&parse_persisted(raw)?, &summary)),
        None => None,
    };
    if matches_persisted == Some(false) {
        tracing::warn!(run_id = %config.run.run_id, "recomputed summary differs from summary.json");
    }

    Ok(GenerateReportResult {
        input_dir: input_dir.to_path_buf(),
        run_id: config.run.run_id,
        summary,
        persisted_summary,
        matches_persisted,
    })
}

fn load_config_from_str(raw: &str) -> Result<Config, String> {
    parse_config(raw).map_err(|err| format!("failed to parse config snapshot TOML: {err}"))
}

fn parse_persisted(raw: &str) -> Result<SummaryStatistics, String> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|err| format!("failed to parse summary.json: {err}"))?;
    let summary = value.get("summary").cloned().unwrap_or(value);
    serde_json::from_value(summary).map_err(|err| format!("invalid summary in summary.json: {err}"))
}

fn summaries_agree(a: &SummaryStatistics, b: &SummaryStatistics) -> bool {
    let close = |x: f64, y: f64| (x - y).abs() <= RELATIVE_TOLERANCE * x.abs().max(y.abs()).max(1.0);
    close(a.initial_capital, b.initial_capital)
        && close(a.final_portfolio_value, b.final_portfolio_value)
        && close(a.total_return_pct, b.total_return_pct)
        && close(a.annualized_return_pct, b.annualized_return_pct)
        && close(a.max_drawdown_pct, b.max_drawdown_pct)
        && close(a.sharpe_ratio, b.sharpe_ratio)
        && close(a.win_rate_pct, b.win_rate_pct)
        && close(a.buy_and_hold_final_value, b.buy_and_hold_final_value)
        && close(a.buy_and_hold_return_pct, b.buy_and_hold_return_pct)
        && close(a.excess_return_pct, b.excess_return_pct)
        && a.bars_processed == b.bars_processed
        && a.buy_count == b.buy_count
        && a.sell_count == b.sell_count
        && a.win_count == b.win_count
        && a.lose_count == b.lose_count
        && a.start_date == b.start_date
        && a.end_date == b.end_date
        && a.elapsed_days == b.elapsed_days
}
