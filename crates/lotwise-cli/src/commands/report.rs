use crate::infra::build_artifact_reader;
use crate::output::print_summary;
use std::path::PathBuf;

pub fn run_report(input: PathBuf) -> Result<(), String> {
    let reader = build_artifact_reader();
    let report = lotwise_application::reporting::generate_report(&input, reader.as_ref())?;

    println!(
        "{} cli: report (run_id={}, input={})",
        lotwise_domain::engine_name(),
        report.run_id,
        report.input_dir.display()
    );
    print_summary(&report.summary);
    match report.matches_persisted {
        Some(true) => println!("summary.json: matches recomputed statistics"),
        Some(false) => println!("summary.json: DIFFERS from recomputed statistics"),
        None => println!("summary.json: not present"),
    }
    Ok(())
}
