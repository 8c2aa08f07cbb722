use crate::config::Config;
use lotwise_domain::services::audit::AuditEvent;
use lotwise_domain::services::metrics::SummaryStatistics;

pub fn summary_meta_json(config: &Config, summary: &SummaryStatistics) -> serde_json::Value {
    serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": config.run.symbol,
        "start_date": summary.start_date,
        "end_date": summary.end_date,
    })
}

pub fn config_snapshot_json(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "run": {
            "run_id": config.run.run_id,
            "symbol": config.run.symbol,
            "sessions": config.run.sessions,
            "end_date": config.end_date(),
        },
        "parameters": config.strategy_parameters(),
        "paths": {
            "bars_csv": config.paths.bars_csv,
            "out_dir": config.paths.out_dir,
        },
    })
}

pub fn timing_event(
    run_id: &str,
    stage: &str,
    symbol: Option<&str>,
    action: &str,
    duration_ms: u64,
    details: serde_json::Value,
) -> AuditEvent {
    AuditEvent {
        run_id: run_id.to_string(),
        date: None,
        stage: stage.to_string(),
        symbol: symbol.map(|s| s.to_string()),
        action: action.to_string(),
        error: None,
        details: serde_json::json!({
            "duration_ms": duration_ms,
            "details": details,
        }),
    }
}

pub fn to_hex_short(bytes: &[u8], chars: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(chars);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        if out.len() >= chars {
            break;
        }
        out.push(HEX[(b & 0x0f) as usize] as char);
        if out.len() >= chars {
            break;
        }
    }
    out
}
