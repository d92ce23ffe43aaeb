use crate::config;
use clap::{Args, Subcommand};
use colored::*;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Interactive configuration setup
    Setup,
    /// Show the current configuration
    Show,
    /// Write a sample configuration file
    Sample,
}

pub fn run(args: ConfigArgs, config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Setup => setup(config_dir),
        ConfigAction::Show => show(config_dir),
        ConfigAction::Sample => sample(config_dir),
    }
}

fn setup(config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config::config_file(config_dir);
    let existing = config::load(&path).unwrap_or_default();
    let theme = ColorfulTheme::default();

    println!("\n{}\n", "Fieldfolio configuration setup".bold());

    let base_url: String = Input::with_theme(&theme)
        .with_prompt("ODK Central base URL")
        .with_initial_text(existing.odk.base_url.clone())
        .interact_text()?;

    let email: String = Input::with_theme(&theme)
        .with_prompt("Email")
        .with_initial_text(existing.odk.email.clone())
        .interact_text()?;

    let password: String = Password::with_theme(&theme)
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?;

    let project_id: String = Input::with_theme(&theme)
        .with_prompt("Default project ID (blank for none)")
        .allow_empty(true)
        .with_initial_text(
            existing
                .odk
                .project_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        )
        .interact_text()?;

    let form_id: String = Input::with_theme(&theme)
        .with_prompt("Default form ID (blank for none)")
        .allow_empty(true)
        .with_initial_text(existing.odk.form_id.clone().unwrap_or_default())
        .interact_text()?;

    let title: String = Input::with_theme(&theme)
        .with_prompt("Report title")
        .with_initial_text(existing.report.title.clone())
        .interact_text()?;

    let include_summary = Confirm::with_theme(&theme)
        .with_prompt("Include summary statistics?")
        .default(existing.report.include_summary)
        .interact()?;

    let include_charts = Confirm::with_theme(&theme)
        .with_prompt("Include charts?")
        .default(existing.report.include_charts)
        .interact()?;

    let include_data_table = Confirm::with_theme(&theme)
        .with_prompt("Include the data table?")
        .default(existing.report.include_data_table)
        .interact()?;

    let max_table_rows: usize = Input::with_theme(&theme)
        .with_prompt("Table rows per page")
        .default(existing.report.max_table_rows)
        .validate_with(|rows: &usize| {
            if *rows >= 1 {
                Ok(())
            } else {
                Err("must be at least 1")
            }
        })
        .interact_text()?;

    let save_password = if password.is_empty() {
        false
    } else {
        Confirm::with_theme(&theme)
            .with_prompt("Save the password to the config file? (not recommended)")
            .default(false)
            .interact()?
    };

    let mut config = existing;
    config.odk.base_url = base_url;
    config.odk.email = email;
    config.odk.password = if save_password { password } else { String::new() };
    config.odk.project_id = if project_id.trim().is_empty() {
        None
    } else {
        Some(project_id.trim().parse()?)
    };
    config.odk.form_id = if form_id.trim().is_empty() {
        None
    } else {
        Some(form_id.trim().to_string())
    };
    config.report.title = title;
    config.report.include_summary = include_summary;
    config.report.include_charts = include_charts;
    config.report.include_data_table = include_data_table;
    config.report.max_table_rows = max_table_rows;

    config::save(&path, &config)?;
    println!(
        "\n{} {}",
        "Configuration saved to".green().bold(),
        path.display()
    );
    Ok(())
}

fn show(config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config::config_file(config_dir);
    let config = config::load(&path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("{}", "ODK Central".bold());
    println!("  Base URL:   {}", or_unset(&config.odk.base_url));
    println!("  Email:      {}", or_unset(&config.odk.email));
    println!(
        "  Password:   {}",
        if config.odk.password.is_empty() { "not set" } else { "set" }
    );
    println!(
        "  Project ID: {}",
        config
            .odk
            .project_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "not set".to_string())
    );
    println!(
        "  Form ID:    {}",
        config.odk.form_id.clone().unwrap_or_else(|| "not set".to_string())
    );
    println!();
    println!("{}", "Report".bold());
    println!("  Title:          {}", config.report.title);
    println!("  Summary:        {}", config.report.include_summary);
    println!("  Charts:         {}", config.report.include_charts);
    println!("  Data table:     {}", config.report.include_data_table);
    println!("  Rows per page:  {}", config.report.max_table_rows);
    println!("  Page size:      {:?}", config.report.page_size);
    println!("  Chart specs:    {}", config.report.charts.len());
    Ok(())
}

fn sample(config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = config::config_dir(config_dir);
    let path = dir.join("config_sample.yaml");
    config::save(&path, &config::sample())?;
    println!("Sample configuration written to {}", path.display());
    println!(
        "Copy it to {} and adjust as needed.",
        dir.join(config::CONFIG_FILE_NAME).display()
    );
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "not set"
    } else {
        value
    }
}
