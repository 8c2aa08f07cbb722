use lotwise_application::config::Config;
use std::path::PathBuf;

pub fn print_config_summary(command: &str, config: &Config, out: Option<&PathBuf>) {
    println!(
        "{} cli: {} (run_id={}, symbol={}, sessions={}, end_date={}, initial_capital={})",
        lotwise_domain::engine_name(),
        command,
        config.run.run_id,
        config.run.symbol,
        config.run.sessions,
        config.end_date(),
        config.run.initial_capital
    );
    println!(
        "strategy: buy_threshold={}, sell_threshold={}",
        config.strategy.buy_threshold, config.strategy.sell_threshold
    );
    println!(
        "costs: buy_fee_rate={}, sell_fee_rate={}, sell_tax_rate={}, lot_size={}",
        config.costs.buy_fee_rate,
        config.costs.sell_fee_rate,
        config.costs.sell_tax_rate,
        config.costs.lot_size
    );
    println!(
        "data: bars_csv={}, out_dir={}",
        config.paths.bars_csv, config.paths.out_dir
    );
    if let Some(out_dir) = out {
        println!("output dir: {}", out_dir.display());
    }
}
