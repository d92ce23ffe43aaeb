pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fieldfolio",
    version,
    about = "ODK Central data downloader and PDF report generator",
    long_about = "Fieldfolio downloads form submissions from an ODK Central server, \
                  exports them to CSV, Excel or JSON, and renders formatted PDF reports \
                  with summary statistics, charts, and data tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Custom configuration directory (default: ~/.fieldfolio)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download form submissions from ODK Central
    Download(commands::download::DownloadArgs),

    /// Generate a PDF report from a downloaded data file
    Report(commands::report::ReportArgs),

    /// List projects and forms on the server
    List(commands::list::ListArgs),

    /// Manage configuration
    Config(commands::config::ConfigArgs),
}
