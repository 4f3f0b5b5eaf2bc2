//! `kerntrace`: export megakernel timelines for ui.perfetto.dev.

mod cli_logger;

use anyhow::Result;
use clap::Parser;

use std::path::PathBuf;

use cli_logger::CliLogger;
use kerntrace::{Config, DEFAULT_CONFIG_PATH, TraceCommand, trace_command};

#[derive(Debug, Parser)]
#[command(name = "kerntrace", version, about)]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print command results as compact JSON.
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: TraceCommand,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let logger = CliLogger::new(cli.json, cli.no_color);
    if let Err(err) = run(&cli, &logger) {
        logger.print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: &Cli, logger: &CliLogger) -> Result<()> {
    let config = Config::load_optional(&cli.config);
    let out = trace_command(&config, &cli.command)?;
    logger.print_serialized(&out)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
