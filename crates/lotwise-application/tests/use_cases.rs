use chrono::{Duration, NaiveDate};
use lotwise_application::backtesting::run_backtest;
use lotwise_application::config::{load_config_with_source, parse_config, Config};
use lotwise_application::experiments::sweep::run_sweep;
use lotwise_application::reporting::generate_report;
use lotwise_application::validation::validate;
use lotwise_domain::repositories::market_data::MarketDataRepository;
use lotwise_domain::value_objects::bar_record::BarAction;
use lotwise_infrastructure::artifacts::{FilesystemArtifactReader, FilesystemArtifactWriter};
use lotwise_infrastructure::market_data::CsvMarketDataRepository;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_tmp_path(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("lotwise_{name}_{}_{}", std::process::id(), now))
}

/// Thirty days from 2024-01-01 cycling through closes 10, 11, 12, 11 with a
/// half-point range around each close.
fn write_cycle_csv(path: &Path) {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let closes = [10.0, 11.0, 12.0, 11.0];
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for i in 0..30 {
        let date = first + Duration::days(i);
        let close = closes[(i % 4) as usize];
        csv.push_str(&format!(
            "{},{},{},{},{},1000\n",
            date,
            close,
            close + 0.5,
            close - 0.5,
            close
        ));
    }
    fs::write(path, csv).expect("write csv");
}

struct Workspace {
    root: PathBuf,
    config_path: PathBuf,
}

fn workspace(name: &str, buy: f64, sell: f64) -> Workspace {
    let root = unique_tmp_path(name);
    fs::create_dir_all(root.join("data")).expect("data dir");
    write_cycle_csv(&root.join("data").join("000001.csv"));

    let config_path = root.join("backtest.toml");
    let config = format!(
        r#"[run]
run_id = "cycle"
symbol = "000001"
sessions = 20
end_date = "2024-01-30"
initial_capital = 100000.0

[strategy]
buy_threshold = {buy:?}
sell_threshold = {sell:?}

[paths]
bars_csv = "{}/data/{{symbol}}.csv"
out_dir = "{}/runs"
"#,
        root.display(),
        root.display()
    );
    fs::write(&config_path, config).expect("write config");
    Workspace { root, config_path }
}

fn repo_for(config_toml: &str) -> CsvMarketDataRepository {
    let config = parse_config(config_toml).expect("config");
    CsvMarketDataRepository::new(config.paths.bars_csv)
}

#[test]
fn backtest_writes_artifacts_and_report_recomputes_them() {
    let ws = workspace("backtest", 10.0, 12.2);
    let (config, config_toml) = load_config_with_source(&ws.config_path).expect("config");
    let repo = repo_for(&config_toml);
    let writer = FilesystemArtifactWriter::new();

    let run = run_backtest(&config, &config_toml, None, &repo, &writer).expect("backtest");
    assert_eq!(run.run_dir, ws.root.join("runs").join("cycle"));
    assert!(!run.widened_window);

    let outcome = &run.outcome;
    assert_eq!(outcome.records.len(), 20);
    assert_eq!(
        outcome.records[0].date,
        NaiveDate::from_ymd_opt(2024, 1, 11).expect("valid date")
    );
    assert!(outcome.summary.buy_count > 0);
    assert!(outcome.summary.sell_count > 0);
    assert_eq!(outcome.summary.win_count, outcome.summary.sell_count);
    assert_eq!(outcome.summary.lose_count, 0);
    assert!(outcome
        .records
        .iter()
        .all(|r| r.position_after % 100 == 0));
    assert!(outcome
        .records
        .iter()
        .filter(|r| r.action == BarAction::Buy)
        .all(|r| r.action_price == Some(9.5)));

    for artifact in [
        "bars.csv",
        "trades.csv",
        "summary.json",
        "summary.html",
        "logs.jsonl",
        "config.toml",
    ] {
        assert!(run.run_dir.join(artifact).exists(), "missing {artifact}");
    }
    let logs = fs::read_to_string(run.run_dir.join("logs.jsonl")).expect("logs");
    assert!(logs.lines().any(|line| line.contains("\"stage\":\"trade\"")));

    let reader = FilesystemArtifactReader::new();
    let report = generate_report(&run.run_dir, &reader).expect("report");
    assert_eq!(report.run_id, "cycle");
    assert_eq!(report.matches_persisted, Some(true));
    assert_eq!(report.summary.bars_processed, 20);
    assert_eq!(report.summary.win_count, outcome.summary.win_count);
}

#[test]
fn report_accepts_run_with_saturated_annualized_return() {
    let ws = workspace("steep", 2.0, 50.0);
    fs::write(
        ws.root.join("data").join("000001.csv"),
        "date,open,high,low,close,volume\n2024-01-29,10,10,1,10,1000\n2024-01-30,10,10,10,10,1000\n",
    )
    .expect("write csv");
    let (config, config_toml) = load_config_with_source(&ws.config_path).expect("config");
    let repo = repo_for(&config_toml);

    let run = run_backtest(&config, &config_toml, None, &repo, &FilesystemArtifactWriter::new())
        .expect("backtest");
    assert!(run.widened_window);
    assert_eq!(run.outcome.summary.annualized_return_pct, f64::MAX);
    let persisted = fs::read_to_string(run.run_dir.join("summary.json")).expect("summary");
    assert!(!persisted.contains("null"));

    let report = generate_report(&run.run_dir, &FilesystemArtifactReader::new()).expect("report");
    assert_eq!(report.matches_persisted, Some(true));
}

#[test]
fn out_override_replaces_configured_out_dir() {
    let ws = workspace("out_override", 10.0, 12.2);
    let (config, config_toml) = load_config_with_source(&ws.config_path).expect("config");
    let repo = repo_for(&config_toml);
    let out = ws.root.join("elsewhere");

    let run = run_backtest(
        &config,
        &config_toml,
        Some(out.clone()),
        &repo,
        &FilesystemArtifactWriter::new(),
    )
    .expect("backtest");
    assert_eq!(run.run_dir, out.join("cycle"));
    assert!(!ws.root.join("runs").exists());
}

#[test]
fn invalid_thresholds_fail_before_any_artifact_is_written() {
    let ws = workspace("invalid", 12.0, 12.0);
    let (config, config_toml) = load_config_with_source(&ws.config_path).expect("config");
    let repo = repo_for(&config_toml);

    let err = run_backtest(
        &config,
        &config_toml,
        None,
        &repo,
        &FilesystemArtifactWriter::new(),
    )
    .expect_err("sell == buy");
    assert!(err.starts_with("invalid parameters"), "{err}");
    assert!(!ws.root.join("runs").exists());
}

#[test]
fn missing_data_file_is_reported_as_unavailable() {
    let ws = workspace("missing", 10.0, 12.2);
    let (config, config_toml) = load_config_with_source(&ws.config_path).expect("config");
    let repo = CsvMarketDataRepository::new(format!("{}/nowhere/{{symbol}}.csv", ws.root.display()));

    let err = run_backtest(
        &config,
        &config_toml,
        None,
        &repo,
        &FilesystemArtifactWriter::new(),
    )
    .expect_err("no data");
    assert!(err.starts_with("data unavailable"), "{err}");
}

#[test]
fn validate_reports_duplicates_and_strict_mode_rejects_them() {
    let ws = workspace("validate", 10.0, 12.2);
    let csv_path = ws.root.join("data").join("000001.csv");
    let mut csv = fs::read_to_string(&csv_path).expect("csv");
    csv.push_str("2024-01-20,11,11.5,10.5,11,1000\n");
    fs::write(&csv_path, csv).expect("rewrite csv");

    let (config, config_toml) = load_config_with_source(&ws.config_path).expect("config");
    let repo = repo_for(&config_toml);

    let report = validate(&config, &repo, false).expect("lenient validate");
    assert_eq!(report.bars, 20);
    assert_eq!(report.quality.duplicates, 1);
    assert!(report.series_accepted);
    assert!(report.has_findings());

    let err = validate(&config, &repo, true).expect_err("strict validate");
    assert!(err.contains("strict validation failed"));
    assert!(err.contains("duplicates=1"));
}

#[test]
fn sweep_runs_grid_and_isolates_invalid_points() {
    let ws = workspace("sweep", 10.0, 12.2);
    let sweep_path = ws.root.join("sweep.toml");
    fs::write(
        &sweep_path,
        r#"[base]
config = "backtest.toml"

[sweep]
id = "grid"
parallelism = 2

[grid]
buy_thresholds = [10.0, 13.0]
sell_thresholds = [12.2, 11.0]

[leaderboard]
sort_by = "total_return_pct"
descending = true
"#,
    )
    .expect("write sweep");

    let writer = FilesystemArtifactWriter::new();
    let factory = |config: &Config| -> Box<dyn MarketDataRepository> {
        Box::new(CsvMarketDataRepository::new(config.paths.bars_csv.clone()))
    };

    let result = run_sweep(&sweep_path, &factory, &writer).expect("sweep");
    assert_eq!(result.bars, 20);
    let statuses: Vec<&str> = result.runs.iter().map(|r| r.status.as_str()).collect();
    assert_eq!(statuses, ["ok", "ok", "error", "error"]);
    assert!(result.runs[0].params.buy_threshold == 10.0);
    assert!(result.runs[1].params.sell_threshold == 11.0);
    assert!(result.runs.iter().all(|r| r.run_id.starts_with("grid__")));
    assert!(result.runs[2]
        .error
        .as_deref()
        .is_some_and(|err| err.starts_with("invalid parameters")));

    let sweep_dir = ws.root.join("runs").join("sweeps").join("grid");
    assert_eq!(result.sweep_dir, sweep_dir);
    for artifact in ["manifest.json", "results.csv", "leaderboard.csv"] {
        assert!(sweep_dir.join(artifact).exists(), "missing {artifact}");
    }
    let leaderboard = fs::read_to_string(sweep_dir.join("leaderboard.csv")).expect("leaderboard");
    assert_eq!(leaderboard.lines().count(), 3);
    assert!(ws
        .root
        .join("runs")
        .join(&result.runs[0].run_id)
        .join("summary.json")
        .exists());
}
