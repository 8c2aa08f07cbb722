use super::common::print_config_summary;
use crate::infra::build_market_data_repo;
use lotwise_application::config::load_config;
use std::path::PathBuf;

pub fn run_validate(config_path: PathBuf, strict: bool) -> Result<(), String> {
    let config = load_config(&config_path)?;
    print_config_summary("validate", &config, None);

    let market_data = build_market_data_repo(&config);
    let report =
        lotwise_application::validation::validate(&config, market_data.as_ref(), strict)?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize validation report: {err}"))?;
    println!("{json}");
    if report.has_findings() {
        tracing::warn!(run_id = %report.run_id, "validation found data issues");
    }
    Ok(())
}
