use crate::config;
use crate::data;
use crate::report;
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct ReportArgs {
    /// Input data file (csv, xlsx, json)
    pub input: PathBuf,

    /// Output PDF file path
    pub output: PathBuf,

    /// Report title override
    #[arg(long)]
    pub title: Option<String>,
}

pub fn run(args: ReportArgs, config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = config::load(&config::config_file(config_dir))?;
    let mut report_config = config.report;
    if let Some(title) = args.title {
        report_config.title = title;
    }

    println!("{} {}", "Loading".dimmed(), args.input.display());
    let dataset = data::import::load(&args.input)?;
    println!(
        "{} {} records with {} columns",
        "Loaded".green().bold(),
        dataset.len(),
        dataset.columns().len()
    );

    let summary = data::summarize(&dataset);

    // With no charts configured, fall back to an automatic selection
    // from the column summary.
    if report_config.include_charts && report_config.charts.is_empty() {
        report_config.charts = report::default_charts(&summary);
    }

    println!("{}", "Generating PDF report...".dimmed());
    let outcome = report::generate(&dataset, &summary, &report_config, &args.output)?;

    println!(
        "{} {} ({} pages, {} charts)",
        "Report written to".green().bold(),
        args.output.display(),
        outcome.pages,
        outcome.charts_rendered
    );
    for warning in &outcome.chart_warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    Ok(())
}
