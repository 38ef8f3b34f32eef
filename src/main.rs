use anyhow::Context;
use clap::Parser;
use parlay_quant::cli::{self, Cli, Commands, ConfigCommands};
use parlay_quant::config::{EngineConfig, LoggingConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Evaluate {
            file,
            seed,
            json,
            bankroll,
        } => cli::run_evaluate(config, &file, seed, json, bankroll),
        Commands::Kelly {
            prob,
            odds,
            bankroll,
            json,
        } => cli::run_kelly(config, prob, odds, bankroll, json),
        Commands::Odds { american } => cli::run_odds(american),
        Commands::Calibrate { file, bins, json } => cli::run_calibrate(&file, bins, json),
        Commands::Config {
            command: ConfigCommands::Show,
        } => cli::show_config(&config),
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
