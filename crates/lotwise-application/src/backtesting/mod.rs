use crate::acquisition::{fetch_recent_sessions, SessionWindow};
use crate::config::Config;
use crate::shared::{config_snapshot_json, summary_meta_json, timing_event};
use lotwise_domain::repositories::artifacts::ArtifactWriter;
use lotwise_domain::repositories::market_data::MarketDataRepository;
use lotwise_domain::services::audit::AuditEvent;
use lotwise_domain::services::engine::{BacktestEngine, BacktestOutcome};
use lotwise_domain::value_objects::price_series::PriceSeries;
use lotwise_domain::value_objects::trade::{Side, TradeOutcome};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub run_dir: PathBuf,
    pub outcome: BacktestOutcome,
    pub widened_window: bool,
}

pub fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    market_data: &dyn MarketDataRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<RunArtifacts, String> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol,
        sessions = config.run.sessions
    )
    .entered();

    let engine = BacktestEngine::new(config.strategy_parameters()).map_err(|err| err.to_string())?;
    let mut audit_extras: Vec<AuditEvent> = Vec::new();

    let stage_start = Instant::now();
    let window = fetch_recent_sessions(
        market_data,
        &config.run.symbol,
        config.run.sessions,
        config.end_date(),
    )
    .map_err(|err| err.to_string())?;
    metrics::histogram!("lotwise.backtest.fetch_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    if window.widened {
        metrics::counter!("lotwise.backtest.window_widened").increment(1);
        tracing::info!(
            bars = window.bars.len(),
            sessions = config.run.sessions,
            "first data window was short; widened"
        );
    }
    audit_extras.push(timing_event(
        &config.run.run_id,
        "timing",
        Some(&config.run.symbol),
        "fetch_daily",
        stage_start.elapsed().as_millis() as u64,
        fetch_details(&window),
    ));

    let widened_window = window.widened;
    let series = PriceSeries::new(window.bars).map_err(|err| err.to_string())?;

    let stage_start = Instant::now();
    let outcome = engine.run(&series).map_err(|err| err.to_string())?;
    let engine_ms = stage_start.elapsed().as_millis() as f64;
    metrics::histogram!("lotwise.backtest.engine_ms").record(engine_ms);
    metrics::gauge!("lotwise.backtest.bars_processed").set(outcome.summary.bars_processed as f64);
    metrics::counter!("lotwise.backtest.trades").increment(outcome.trades.len() as u64);
    audit_extras.push(timing_event(
        &config.run.run_id,
        "timing",
        Some(&config.run.symbol),
        "run_engine",
        stage_start.elapsed().as_millis() as u64,
        serde_json::json!({ "bars": series.len() }),
    ));

    tracing::info!(
        final_value = outcome.summary.final_portfolio_value,
        total_return_pct = outcome.summary.total_return_pct,
        trades = outcome.trades.len(),
        "backtest complete"
    );

    let run_dir = write_outputs(config, config_toml, out, &outcome, artifacts, audit_extras)?;
    Ok(RunArtifacts {
        run_dir,
        outcome,
        widened_window,
    })
}

fn fetch_details(window: &SessionWindow) -> serde_json::Value {
    serde_json::json!({
        "rows": window.bars.len(),
        "widened": window.widened,
        "query_start": window.query_start,
        "query_end": window.query_end,
        "duplicates": window.report.duplicates,
        "out_of_order": window.report.out_of_order,
        "ohlc_violations": window.report.ohlc_violations,
        "max_calendar_gap_days": window.report.max_calendar_gap_days,
    })
}

fn write_outputs(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    outcome: &BacktestOutcome,
    artifacts: &dyn ArtifactWriter,
    mut audit_extras: Vec<AuditEvent>,
) -> Result<PathBuf, String> {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_bars_csv(run_dir.join("bars.csv").as_path(), &outcome.records)?;
    artifacts.write_trades_csv(run_dir.join("trades.csv").as_path(), &outcome.trades)?;

    let meta = summary_meta_json(config, &outcome.summary);
    let config_snapshot = config_snapshot_json(config);
    artifacts.write_summary_json(
        run_dir.join("summary.json").as_path(),
        &outcome.summary,
        Some(&meta),
        Some(&config_snapshot),
    )?;
    artifacts.write_summary_html(
        run_dir.join("summary.html").as_path(),
        &outcome.summary,
        Some(&meta),
    )?;

    let mut audit_events = trade_events(config, outcome);
    audit_events.append(&mut audit_extras);
    audit_events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.stage.cmp(&b.stage))
            .then_with(|| a.action.cmp(&b.action))
    });
    artifacts.write_audit_jsonl(run_dir.join("logs.jsonl").as_path(), &audit_events)?;

    artifacts.write_config_snapshot_toml(run_dir.join("config.toml").as_path(), config_toml)?;

    Ok(run_dir)
}

fn trade_events(config: &Config, outcome: &BacktestOutcome) -> Vec<AuditEvent> {
    let mut events = Vec::with_capacity(outcome.trades.len() + 1);
    for trade in &outcome.trades {
        let action = match trade.side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        let result = trade.outcome.map(|o| match o {
            TradeOutcome::Win => "win",
            TradeOutcome::Lose => "lose",
        });
        events.push(AuditEvent {
            run_id: config.run.run_id.clone(),
            date: Some(trade.date),
            stage: "trade".to_string(),
            symbol: Some(config.run.symbol.clone()),
            action: action.to_string(),
            error: None,
            details: serde_json::json!({
                "units": trade.units,
                "price": trade.price,
                "notional": trade.notional,
                "fee": trade.fee,
                "tax": trade.tax,
                "cash_after": trade.cash_after,
                "outcome": result,
            }),
        });
    }

    let summary = &outcome.summary;
    events.push(AuditEvent {
        run_id: config.run.run_id.clone(),
        date: summary.end_date,
        stage: "summary".to_string(),
        symbol: Some(config.run.symbol.clone()),
        action: "complete".to_string(),
        error: None,
        details: serde_json::json!({
            "bars_processed": summary.bars_processed,
            "final_portfolio_value": summary.final_portfolio_value,
            "total_return_pct": summary.total_return_pct,
            "max_drawdown_pct": summary.max_drawdown_pct,
            "sharpe_ratio": summary.sharpe_ratio,
            "win_rate_pct": summary.win_rate_pct,
        }),
    });
    events
}
