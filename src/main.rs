use clap::Parser;
use colored::*;
use fieldfolio::cli::{Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Logging level comes from FIELDFOLIO_LOG, raised by repeated -v flags
    let log_level = std::env::var("FIELDFOLIO_LOG").unwrap_or_else(|_| {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
        .to_string()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<fieldfolio::FieldfolioError>() {
            Some(fieldfolio::FieldfolioError::Config(_)) => 2,
            Some(fieldfolio::FieldfolioError::Io(_)) => 3,
            Some(fieldfolio::FieldfolioError::Parse(_))
            | Some(fieldfolio::FieldfolioError::UnsupportedFormat(_)) => 4,
            Some(fieldfolio::FieldfolioError::Auth(_)) => 5,
            Some(fieldfolio::FieldfolioError::Network(_)) => 6,
            Some(fieldfolio::FieldfolioError::NotFound(_)) => 7,
            Some(fieldfolio::FieldfolioError::Chart(_))
            | Some(fieldfolio::FieldfolioError::Render(_)) => 8,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_dir = cli.config_dir.clone();
    match cli.command {
        Commands::Download(args) => fieldfolio::cli::commands::download::run(args, config_dir),
        Commands::Report(args) => fieldfolio::cli::commands::report::run(args, config_dir),
        Commands::List(args) => fieldfolio::cli::commands::list::run(args, config_dir),
        Commands::Config(args) => fieldfolio::cli::commands::config::run(args, config_dir),
    }
}
