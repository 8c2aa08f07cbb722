mod commands;
mod infra;
mod obs;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lotwise")]
#[command(
    about = "Threshold backtests over daily bars with lot-sized fills",
    version,
    arg_required_else_help = true
)]
#[command(
    after_help = "Examples:\n  lotwise backtest --config configs/sample.toml --out runs/\n  lotwise sweep --config configs/sweep.toml\n  lotwise validate --config configs/sample.toml --strict\n  lotwise report --input runs/<run_id>/\n"
)]
struct Cli {
    /// Log filter when LOTWISE_LOG is unset (e.g. info, lotwise_application=debug).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Serve Prometheus metrics on host:port while the command runs.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run one backtest and write its artifacts.
    Backtest {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run a buy/sell threshold grid over one data window.
    Sweep {
        #[arg(long)]
        config: PathBuf,
    },
    /// Check parameters and data quality without simulating.
    Validate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Recompute a run's summary from its bars.csv.
    Report {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let log_format = match cli.log_format {
        LogFormat::Text => "text",
        LogFormat::Json => "json",
    };
    if let Err(err) = obs::init_tracing(&cli.log_level, log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    output::print_banner();

    let command = match cli.command {
        CliCommand::Backtest { config, out } => Command::Backtest { config, out },
        CliCommand::Sweep { config } => Command::Sweep { config },
        CliCommand::Validate { config, strict } => Command::Validate { config, strict },
        CliCommand::Report { input } => Command::Report { input },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        let code = if err.contains("strict validation failed") {
            2
        } else {
            1
        };
        std::process::exit(code);
    }
}
