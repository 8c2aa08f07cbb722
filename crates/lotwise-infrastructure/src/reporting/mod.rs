use chrono::NaiveDate;
use lotwise_domain::services::audit::AuditEvent;
use lotwise_domain::services::metrics::SummaryStatistics;
use lotwise_domain::value_objects::bar_record::{BarAction, BarRecord};
use lotwise_domain::value_objects::trade::{Side, Trade, TradeOutcome};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

const BARS_HEADER: [&str; 8] = [
    "date",
    "close",
    "cash_after",
    "position_after",
    "portfolio_value_after",
    "action",
    "action_price",
    "buy_and_hold_value",
];

pub fn write_audit_jsonl(path: &Path, events: &[AuditEvent]) -> Result<(), String> {
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create logs: {}", err))?;
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|err| format!("failed to serialize audit event: {}", err))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|err| format!("failed to write audit event: {}", err))?;
    }
    Ok(())
}

/// One row per processed bar. Floats are written with their shortest
/// round-trip representation so `report` can recompute identical metrics.
pub fn write_bars_csv(path: &Path, records: &[BarRecord]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create bars csv {}: {}", path.display(), err))?;
    wtr.write_record(BARS_HEADER)
        .map_err(|err| format!("failed to write bars csv header: {}", err))?;

    for record in records {
        wtr.write_record([
            record.date.to_string(),
            record.close.to_string(),
            record.cash_after.to_string(),
            record.position_after.to_string(),
            record.portfolio_value_after.to_string(),
            record.action.as_str().to_string(),
            record
                .action_price
                .map(|price| price.to_string())
                .unwrap_or_default(),
            record.buy_and_hold_value.to_string(),
        ])
        .map_err(|err| format!("failed to write bars row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush bars csv: {}", err))
}

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create trades csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "date",
        "side",
        "units",
        "price",
        "notional",
        "fee",
        "tax",
        "cash_after",
        "outcome",
    ])
    .map_err(|err| format!("failed to write trades csv header: {}", err))?;

    for trade in trades {
        let side = match trade.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let outcome = match trade.outcome {
            Some(TradeOutcome::Win) => "win",
            Some(TradeOutcome::Lose) => "lose",
            None => "",
        };
        wtr.write_record([
            trade.date.to_string(),
            side.to_string(),
            trade.units.to_string(),
            trade.price.to_string(),
            trade.notional.to_string(),
            trade.fee.to_string(),
            trade.tax.to_string(),
            trade.cash_after.to_string(),
            outcome.to_string(),
        ])
        .map_err(|err| format!("failed to write trades row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush trades csv: {}", err))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMeta {
    pub run_id: String,
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn write_summary_json(
    path: &Path,
    summary: &SummaryStatistics,
    meta: Option<&SummaryMeta>,
    config_snapshot: Option<&serde_json::Value>,
) -> Result<(), String> {
    let json = serde_json::json!({
        "meta": meta,
        "config_snapshot": config_snapshot,
        "summary": summary,
    });
    let json = serde_json::to_string_pretty(&json)
        .map_err(|err| format!("failed to serialize summary: {}", err))?;
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create summary: {}", err))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write summary: {}", err))
}

pub fn write_summary_html(
    path: &Path,
    summary: &SummaryStatistics,
    meta: Option<&SummaryMeta>,
) -> Result<(), String> {
    let (run_id, symbol) = match meta {
        Some(meta) => (meta.run_id.as_str(), meta.symbol.as_str()),
        None => ("unknown", "unknown"),
    };
    let shown = summary.rounded();
    let date_or_unknown =
        |date: Option<NaiveDate>| date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string());
    let start = date_or_unknown(shown.start_date);
    let end = date_or_unknown(shown.end_date);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>Lotwise Backtest Summary</title>
  <style>
    body {{ font-family: ui-sans-serif, system-ui; padding: 24px; }}
    table {{ border-collapse: collapse; width: 520px; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; }}
    th {{ background: #f6f6f6; text-align: left; }}
    code {{ background: #f2f2f2; padding: 2px 6px; border-radius: 4px; }}
  </style>
</head>
<body>
  <h1>Lotwise Backtest Summary</h1>
  <p><strong>run_id:</strong> <code>{run_id}</code></p>
  <p><strong>symbol:</strong> <code>{symbol}</code></p>
  <p><strong>start:</strong> <code>{start}</code></p>
  <p><strong>end:</strong> <code>{end}</code></p>
  <h2>Strategy</h2>
  <table>
    <tr><th>initial_capital</th><td>{:.2}</td></tr>
    <tr><th>final_portfolio_value</th><td>{:.2}</td></tr>
    <tr><th>total_return_pct</th><td>{:.2}</td></tr>
    <tr><th>annualized_return_pct</th><td>{:.2}</td></tr>
    <tr><th>max_drawdown_pct</th><td>{:.2}</td></tr>
    <tr><th>sharpe_ratio</th><td>{:.2}</td></tr>
    <tr><th>win_rate_pct</th><td>{:.2}</td></tr>
    <tr><th>bars_processed</th><td>{}</td></tr>
    <tr><th>buys / sells</th><td>{} / {}</td></tr>
    <tr><th>wins / losses</th><td>{} / {}</td></tr>
  </table>
  <h2>Buy and hold</h2>
  <table>
    <tr><th>final_value</th><td>{:.2}</td></tr>
    <tr><th>return_pct</th><td>{:.2}</td></tr>
    <tr><th>excess_return_pct</th><td>{:.2}</td></tr>
  </table>
</body>
</html>"#,
        shown.initial_capital,
        shown.final_portfolio_value,
        shown.total_return_pct,
        shown.annualized_return_pct,
        shown.max_drawdown_pct,
        shown.sharpe_ratio,
        shown.win_rate_pct,
        shown.bars_processed,
        shown.buy_count,
        shown.sell_count,
        shown.win_count,
        shown.lose_count,
        shown.buy_and_hold_final_value,
        shown.buy_and_hold_return_pct,
        shown.excess_return_pct,
    );

    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create html: {}", err))?;
    file.write_all(html.as_bytes())
        .map_err(|err| format!("failed to write html: {}", err))
}

#[derive(Debug, Clone, Deserialize)]
struct BarRow {
    date: NaiveDate,
    close: f64,
    cash_after: f64,
    position_after: u64,
    portfolio_value_after: f64,
    action: String,
    action_price: Option<f64>,
    buy_and_hold_value: f64,
}

pub fn read_bars_csv(path: &Path) -> Result<Vec<BarRecord>, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open bars csv {}: {}", path.display(), err))?;
    let mut records = Vec::new();
    for result in rdr.deserialize::<BarRow>() {
        let row = result.map_err(|err| format!("failed to parse bar record: {}", err))?;
        let action = BarAction::parse(&row.action)
            .ok_or_else(|| format!("invalid action '{}'", row.action))?;
        records.push(BarRecord {
            date: row.date,
            close: row.close,
            cash_after: row.cash_after,
            position_after: row.position_after,
            portfolio_value_after: row.portfolio_value_after,
            action,
            action_price: row.action_price,
            buy_and_hold_value: row.buy_and_hold_value,
        });
    }
    Ok(records)
}
