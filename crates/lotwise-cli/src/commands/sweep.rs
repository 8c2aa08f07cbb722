use crate::infra::{build_artifact_writer, build_market_data_repo};
use lotwise_application::config::Config;
use lotwise_domain::repositories::market_data::MarketDataRepository;
use std::path::PathBuf;

pub fn run_sweep(sweep_path: PathBuf) -> Result<(), String> {
    let factory = |config: &Config| -> Box<dyn MarketDataRepository> {
        build_market_data_repo(config)
    };
    let artifacts = build_artifact_writer();
    let result =
        lotwise_application::experiments::sweep::run_sweep(&sweep_path, &factory, artifacts.as_ref())?;

    let failed = result.runs.iter().filter(|r| r.status != "ok").count();
    println!(
        "sweep {}: {} runs over {} bars ({} failed)",
        result.sweep_id,
        result.runs.len(),
        result.bars,
        failed
    );
    for run in result.runs.iter().filter(|r| r.status != "ok") {
        println!(
            "  {} buy={} sell={}: {}",
            run.run_id,
            run.params.buy_threshold,
            run.params.sell_threshold,
            run.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("sweep output: {}", result.sweep_dir.display());
    Ok(())
}
