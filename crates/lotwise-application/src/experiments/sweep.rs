use crate::acquisition::fetch_recent_sessions;
use crate::backtesting::run_backtest;
use crate::config::{load_config_with_source, parse_config, Config};
use crate::shared::to_hex_short;
use lotwise_domain::repositories::artifacts::ArtifactWriter;
use lotwise_domain::repositories::market_data::{DailyBarQuery, MarketDataRepository};
use lotwise_domain::services::metrics::SummaryStatistics;
use lotwise_domain::services::series_quality::SeriesQualityReport;
use lotwise_domain::value_objects::price_bar::PriceBar;
use lotwise_domain::BacktestError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepFile {
    pub base: SweepBase,
    pub sweep: SweepMeta,
    pub grid: SweepGrid,
    pub leaderboard: Option<LeaderboardConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepBase {
    pub config: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepMeta {
    pub id: String,
    /// Worker threads; rayon's default when absent.
    pub parallelism: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepGrid {
    pub buy_thresholds: Vec<f64>,
    pub sell_thresholds: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeaderboardConfig {
    pub sort_by: Option<String>,
    pub descending: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRunEntry {
    pub run_id: String,
    pub params: GridPoint,
    pub status: String,
    pub error: Option<String>,
    pub metrics: Option<RunMetrics>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunMetrics {
    pub final_portfolio_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub win_rate_pct: f64,
    pub excess_return_pct: f64,
    pub buy_count: usize,
    pub sell_count: usize,
}

impl From<&SummaryStatistics> for RunMetrics {
    fn from(summary: &SummaryStatistics) -> Self {
        Self {
            final_portfolio_value: summary.final_portfolio_value,
            total_return_pct: summary.total_return_pct,
            annualized_return_pct: summary.annualized_return_pct,
            max_drawdown_pct: summary.max_drawdown_pct,
            sharpe_ratio: summary.sharpe_ratio,
            win_rate_pct: summary.win_rate_pct,
            excess_return_pct: summary.excess_return_pct,
            buy_count: summary.buy_count,
            sell_count: summary.sell_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub sweep_id: String,
    pub sweep_dir: PathBuf,
    pub base_config: String,
    pub bars: usize,
    pub runs: Vec<SweepRunEntry>,
}

pub type MarketDataFactory = dyn Fn(&Config) -> Box<dyn MarketDataRepository>;

/// Runs every `buy × sell` grid point against one shared fetch of the base
/// config's data window. Points run in parallel; results keep grid order.
pub fn run_sweep(
    sweep_path: &Path,
    market_data_factory: &MarketDataFactory,
    artifacts: &(dyn ArtifactWriter + Sync),
) -> Result<SweepResult, String> {
    let raw = std::fs::read_to_string(sweep_path).map_err(|err| {
        format!(
            "failed to read sweep config {}: {err}",
            sweep_path.display()
        )
    })?;
    let sweep: SweepFile = toml::from_str(&raw)
        .map_err(|err| format!("failed to parse sweep TOML {}: {err}", sweep_path.display()))?;
    validate_grid(&sweep.grid)?;

    let _span = info_span!("run_sweep", sweep_id = %sweep.sweep.id).entered();

    let base_config_path = resolve_base_config_path(sweep_path, &sweep.base.config);
    let (base_config, base_toml_str) = load_config_with_source(base_config_path.as_path())?;
    let base_toml_value: toml::Value = toml::from_str(&base_toml_str)
        .map_err(|err| format!("failed to parse base config TOML as value: {err}"))?;

    let out_dir = PathBuf::from(&base_config.paths.out_dir);
    let sweep_dir = out_dir.join("sweeps").join(&sweep.sweep.id);
    std::fs::create_dir_all(&sweep_dir)
        .map_err(|err| format!("failed to create sweep dir {}: {err}", sweep_dir.display()))?;

    let market_data = market_data_factory(&base_config);
    let window = fetch_recent_sessions(
        market_data.as_ref(),
        &base_config.run.symbol,
        base_config.run.sessions,
        base_config.end_date(),
    )
    .map_err(|err| err.to_string())?;
    let bars = window.bars.len();
    let in_memory_market = InMemoryMarketDataRepository {
        bars: window.bars,
        report: window.report,
    };

    let grid = expand_grid(&sweep.grid);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(sweep.sweep.parallelism.unwrap_or(0))
        .build()
        .map_err(|err| format!("failed to build sweep thread pool: {err}"))?;

    let stage_start = Instant::now();
    let runs: Vec<SweepRunEntry> = pool.install(|| {
        grid.par_iter()
            .map(|point| {
                run_point(
                    &sweep.sweep.id,
                    *point,
                    &base_toml_value,
                    &in_memory_market,
                    artifacts,
                )
            })
            .collect()
    });
    metrics::histogram!("lotwise.sweep.total_ms").record(stage_start.elapsed().as_millis() as f64);

    let failed = runs.iter().filter(|r| r.status != "ok").count();
    metrics::counter!("lotwise.sweep.runs").increment(runs.len() as u64);
    metrics::counter!("lotwise.sweep.failed_runs").increment(failed as u64);
    tracing::info!(runs = runs.len(), failed, "sweep complete");

    let result = SweepResult {
        sweep_id: sweep.sweep.id.clone(),
        sweep_dir: sweep_dir.clone(),
        base_config: base_config_path.display().to_string(),
        bars,
        runs,
    };

    write_manifest(&sweep_dir, &result)?;
    write_results_csv(&sweep_dir, &result)?;
    write_leaderboard_csv(&sweep_dir, &result, sweep.leaderboard.as_ref())?;

    Ok(result)
}

fn run_point(
    sweep_id: &str,
    point: GridPoint,
    base_toml_value: &toml::Value,
    market_data: &InMemoryMarketDataRepository,
    artifacts: &(dyn ArtifactWriter + Sync),
) -> SweepRunEntry {
    let run_id = format!("{}__{}", sweep_id, point_hash(point));
    let result = point_config(base_toml_value, point, &run_id).and_then(|(config, config_toml)| {
        run_backtest(&config, &config_toml, None, market_data, artifacts)
    });

    match result {
        Ok(run) => SweepRunEntry {
            run_id,
            params: point,
            status: "ok".to_string(),
            error: None,
            metrics: Some(RunMetrics::from(&run.outcome.summary)),
        },
        Err(err) => {
            tracing::warn!(run_id = %run_id, error = %err, "sweep point failed");
            SweepRunEntry {
                run_id,
                params: point,
                status: "error".to_string(),
                error: Some(err),
                metrics: None,
            }
        }
    }
}

fn point_config(
    base: &toml::Value,
    point: GridPoint,
    run_id: &str,
) -> Result<(Config, String), String> {
    let mut toml_value = base.clone();
    set_path_value(
        &mut toml_value,
        "strategy.buy_threshold",
        toml::Value::Float(point.buy_threshold),
    )?;
    set_path_value(
        &mut toml_value,
        "strategy.sell_threshold",
        toml::Value::Float(point.sell_threshold),
    )?;
    set_path_value(
        &mut toml_value,
        "run.run_id",
        toml::Value::String(run_id.to_string()),
    )?;

    let config_toml = toml::to_string_pretty(&toml_value)
        .map_err(|err| format!("failed to serialize sweep config TOML: {err}"))?;
    let config = parse_config(&config_toml)
        .map_err(|err| format!("failed to parse generated config TOML: {err}"))?;
    Ok((config, config_toml))
}

fn resolve_base_config_path(sweep_path: &Path, base: &str) -> PathBuf {
    let p = PathBuf::from(base);
    if p.is_absolute() {
        p
    } else {
        sweep_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(p)
    }
}

fn validate_grid(grid: &SweepGrid) -> Result<(), String> {
    if grid.buy_thresholds.is_empty() {
        return Err("sweep grid has no buy_thresholds".to_string());
    }
    if grid.sell_thresholds.is_empty() {
        return Err("sweep grid has no sell_thresholds".to_string());
    }
    // Run ids hash the printed values, so a repeat would share a run directory.
    for (axis, values) in [
        ("buy_thresholds", &grid.buy_thresholds),
        ("sell_thresholds", &grid.sell_thresholds),
    ] {
        let mut seen = HashSet::new();
        if let Some(repeated) = values.iter().find(|value| !seen.insert(value.to_string())) {
            return Err(format!("sweep grid repeats {repeated} in {axis}"));
        }
    }
    Ok(())
}

/// Buy thresholds vary slowest.
fn expand_grid(grid: &SweepGrid) -> Vec<GridPoint> {
    grid.buy_thresholds
        .iter()
        .flat_map(|&buy_threshold| {
            grid.sell_thresholds.iter().map(move |&sell_threshold| GridPoint {
                buy_threshold,
                sell_threshold,
            })
        })
        .collect()
}

fn point_hash(point: GridPoint) -> String {
    let canonical = format!(
        "buy_threshold={}\nsell_threshold={}",
        point.buy_threshold, point.sell_threshold
    );
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let bytes = hasher.finalize();
    to_hex_short(&bytes[..], 12)
}

fn set_path_value(root: &mut toml::Value, path: &str, value: toml::Value) -> Result<(), String> {
    let parts: Vec<&str> = path
        .split('.')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return Err("empty path".to_string());
    }
    let mut cur = root;
    for key in &parts[..parts.len() - 1] {
        cur = cur
            .get_mut(*key)
            .ok_or_else(|| format!("path not found: {}", path))?;
        if !cur.is_table() {
            return Err(format!("path is not a table: {}", path));
        }
    }
    let last = parts[parts.len() - 1];
    let table = cur
        .as_table_mut()
        .ok_or_else(|| format!("path is not a table: {}", path))?;
    if !table.contains_key(last) {
        return Err(format!("path not found: {}", path));
    }
    table.insert(last.to_string(), value);
    Ok(())
}

fn write_manifest(dir: &Path, result: &SweepResult) -> Result<(), String> {
    let path = dir.join("manifest.json");
    let json = serde_json::to_string_pretty(result)
        .map_err(|err| format!("failed to serialize manifest: {err}"))?;
    std::fs::write(&path, json)
        .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
    Ok(())
}

const METRIC_COLUMNS: [&str; 9] = [
    "final_portfolio_value",
    "total_return_pct",
    "annualized_return_pct",
    "max_drawdown_pct",
    "sharpe_ratio",
    "win_rate_pct",
    "excess_return_pct",
    "buy_count",
    "sell_count",
];

fn metric_fields(m: &RunMetrics) -> Vec<String> {
    vec![
        m.final_portfolio_value.to_string(),
        m.total_return_pct.to_string(),
        m.annualized_return_pct.to_string(),
        m.max_drawdown_pct.to_string(),
        m.sharpe_ratio.to_string(),
        m.win_rate_pct.to_string(),
        m.excess_return_pct.to_string(),
        m.buy_count.to_string(),
        m.sell_count.to_string(),
    ]
}

fn write_results_csv(dir: &Path, result: &SweepResult) -> Result<(), String> {
    let path = dir.join("results.csv");
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
    let mut header = vec!["run_id", "buy_threshold", "sell_threshold", "status"];
    header.extend(METRIC_COLUMNS);
    header.push("error");
    wtr.write_record(&header)
        .map_err(|err| format!("failed to write results header: {err}"))?;

    for r in &result.runs {
        let mut record = vec![
            r.run_id.clone(),
            r.params.buy_threshold.to_string(),
            r.params.sell_threshold.to_string(),
            r.status.clone(),
        ];
        match &r.metrics {
            Some(m) => record.extend(metric_fields(m)),
            None => record.extend(METRIC_COLUMNS.iter().map(|_| String::new())),
        }
        record.push(r.error.clone().unwrap_or_default());
        wtr.write_record(record)
            .map_err(|err| format!("failed to write results row: {err}"))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush {}: {err}", path.display()))?;
    Ok(())
}

fn write_leaderboard_csv(
    dir: &Path,
    result: &SweepResult,
    cfg: Option<&LeaderboardConfig>,
) -> Result<(), String> {
    let sort_by = cfg
        .and_then(|c| c.sort_by.as_deref())
        .unwrap_or("total_return_pct")
        .trim()
        .to_lowercase();
    let descending = cfg.and_then(|c| c.descending).unwrap_or(true);

    let rows = ranked(&result.runs, &sort_by, descending);

    let path = dir.join("leaderboard.csv");
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
    let mut header = vec!["rank", "run_id", "buy_threshold", "sell_threshold"];
    header.extend(METRIC_COLUMNS);
    wtr.write_record(&header)
        .map_err(|err| format!("failed to write leaderboard header: {err}"))?;

    for (idx, (r, m)) in rows.iter().enumerate() {
        let mut record = vec![
            (idx + 1).to_string(),
            r.run_id.clone(),
            r.params.buy_threshold.to_string(),
            r.params.sell_threshold.to_string(),
        ];
        record.extend(metric_fields(m));
        wtr.write_record(record)
            .map_err(|err| format!("failed to write leaderboard row: {err}"))?;
    }
    wtr.flush()
        .map_err(|err| format!("failed to flush {}: {err}", path.display()))?;
    Ok(())
}

/// Successful runs ordered by `sort_by`; equal scores keep grid order.
fn ranked<'a>(
    runs: &'a [SweepRunEntry],
    sort_by: &str,
    descending: bool,
) -> Vec<(&'a SweepRunEntry, RunMetrics)> {
    let mut rows: Vec<(&SweepRunEntry, RunMetrics)> = runs
        .iter()
        .filter(|r| r.status == "ok")
        .filter_map(|r| r.metrics.map(|m| (r, m)))
        .collect();
    rows.sort_by(|(_, a), (_, b)| {
        let av = metric_value(a, sort_by);
        let bv = metric_value(b, sort_by);
        let ord = av.partial_cmp(&bv).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
    rows
}

fn metric_value(m: &RunMetrics, key: &str) -> f64 {
    match key {
        "final_portfolio_value" | "final_value" => m.final_portfolio_value,
        "annualized_return_pct" => m.annualized_return_pct,
        "max_drawdown_pct" | "max_drawdown" => m.max_drawdown_pct,
        "sharpe_ratio" | "sharpe" => m.sharpe_ratio,
        "win_rate_pct" | "win_rate" => m.win_rate_pct,
        "excess_return_pct" => m.excess_return_pct,
        "buy_count" | "trades" => m.buy_count as f64,
        _ => m.total_return_pct,
    }
}

/// Serves the pre-fetched window to every grid point.
struct InMemoryMarketDataRepository {
    bars: Vec<PriceBar>,
    report: SeriesQualityReport,
}

impl MarketDataRepository for InMemoryMarketDataRepository {
    fn load_daily(
        &self,
        _query: &DailyBarQuery,
    ) -> Result<(Vec<PriceBar>, SeriesQualityReport), BacktestError> {
        Ok((self.bars.clone(), self.report.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(run_id: &str, total_return_pct: Option<f64>) -> SweepRunEntry {
        SweepRunEntry {
            run_id: run_id.to_string(),
            params: GridPoint {
                buy_threshold: 1.0,
                sell_threshold: 2.0,
            },
            status: if total_return_pct.is_some() { "ok" } else { "error" }.to_string(),
            error: None,
            metrics: total_return_pct.map(|total_return_pct| RunMetrics {
                final_portfolio_value: 0.0,
                total_return_pct,
                annualized_return_pct: 0.0,
                max_drawdown_pct: 0.0,
                sharpe_ratio: 0.0,
                win_rate_pct: 0.0,
                excess_return_pct: 0.0,
                buy_count: 0,
                sell_count: 0,
            }),
        }
    }

    #[test]
    fn expand_grid_is_deterministic() {
        let grid = SweepGrid {
            buy_thresholds: vec![10.0, 10.5],
            sell_thresholds: vec![11.0, 12.0, 13.0],
        };
        let points = expand_grid(&grid);
        assert_eq!(points.len(), 6);
        assert_eq!(
            points[0],
            GridPoint {
                buy_threshold: 10.0,
                sell_threshold: 11.0
            }
        );
        assert_eq!(
            points[5],
            GridPoint {
                buy_threshold: 10.5,
                sell_threshold: 13.0
            }
        );
    }

    #[test]
    fn point_hash_is_stable_and_distinct() {
        let a = GridPoint {
            buy_threshold: 10.0,
            sell_threshold: 12.0,
        };
        let b = GridPoint {
            buy_threshold: 12.0,
            sell_threshold: 10.0,
        };
        assert_eq!(point_hash(a), point_hash(a));
        assert_eq!(point_hash(a).len(), 12);
        assert_ne!(point_hash(a), point_hash(b));
    }

    #[test]
    fn set_path_value_rejects_unknown_path() {
        let mut v: toml::Value = toml::from_str("[a]\nb=1\n").expect("toml");
        let err = set_path_value(&mut v, "a.c", toml::Value::Integer(2)).expect_err("unknown");
        assert!(err.contains("path not found"));
    }

    #[test]
    fn ranking_skips_failures_and_keeps_ties_in_grid_order() {
        let runs = vec![
            entry("a", Some(1.0)),
            entry("b", None),
            entry("c", Some(5.0)),
            entry("d", Some(1.0)),
        ];
        let ids = |rows: Vec<(&SweepRunEntry, RunMetrics)>| {
            rows.iter().map(|(r, _)| r.run_id.clone()).collect::<Vec<_>>()
        };
        assert_eq!(ids(ranked(&runs, "total_return_pct", true)), ["c", "a", "d"]);
        assert_eq!(ids(ranked(&runs, "total_return_pct", false)), ["a", "d", "c"]);
    }

    #[test]
    fn empty_grid_axis_is_rejected() {
        let grid = SweepGrid {
            buy_thresholds: vec![10.0],
            sell_thresholds: Vec::new(),
        };
        assert!(validate_grid(&grid).is_err());
    }

    #[test]
    fn repeated_grid_value_is_rejected() {
        let grid = SweepGrid {
            buy_thresholds: vec![10.0, 10.0],
            sell_thresholds: vec![11.0, 12.0],
        };
        let err = validate_grid(&grid).expect_err("duplicate buy threshold");
        assert!(err.contains("repeats 10 in buy_thresholds"));

        let grid = SweepGrid {
            buy_thresholds: vec![10.0, 10.5],
            sell_thresholds: vec![12.0, 11.0, 12.0],
        };
        assert!(validate_grid(&grid).expect_err("duplicate sell").contains("sell_thresholds"));
    }
}
