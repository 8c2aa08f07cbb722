use super::common::print_config_summary;
use crate::infra::build_engine_deps;
use crate::output::print_summary;
use lotwise_application::config::load_config_with_source;
use std::path::PathBuf;

pub fn run_backtest(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let (config, config_toml) = load_config_with_source(&config_path)?;
    print_config_summary("backtest", &config, out.as_ref());

    let deps = build_engine_deps(&config);
    let run = lotwise_application::backtesting::run_backtest(
        &config,
        &config_toml,
        out,
        deps.market_data.as_ref(),
        deps.artifacts.as_ref(),
    )?;

    if run.widened_window {
        println!("note: first data window was short; query was widened once");
    }
    print_summary(&run.outcome.summary);
    println!("run output: {}", run.run_dir.display());
    Ok(())
}
