mod backtest;
mod common;
mod report;
mod sweep;
mod validate;

use std::path::PathBuf;
use std::time::Instant;

pub enum Command {
    Backtest { config: PathBuf, out: Option<PathBuf> },
    Sweep { config: PathBuf },
    Validate { config: PathBuf, strict: bool },
    Report { input: PathBuf },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Backtest { .. } => "backtest",
            Command::Sweep { .. } => "sweep",
            Command::Validate { .. } => "validate",
            Command::Report { .. } => "report",
        }
    }
}

pub fn run(command: Command) -> Result<(), String> {
    let name = command.name();
    let started = Instant::now();
    let result = match command {
        Command::Backtest { config, out } => backtest::run_backtest(config, out),
        Command::Sweep { config } => sweep::run_sweep(config),
        Command::Validate { config, strict } => validate::run_validate(config, strict),
        Command::Report { input } => report::run_report(input),
    };
    metrics::histogram!("lotwise.cli.command_ms", "command" => name)
        .record(started.elapsed().as_millis() as f64);
    result
}
