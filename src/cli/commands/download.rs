use crate::client::{FetchProgress, HttpTransport, OdkClient, DEFAULT_PAGE_SIZE};
use crate::config::{self, OdkConfig};
use crate::data::{self, ExportFormat};
use anyhow::bail;
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct DownloadArgs {
    /// ODK Central base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Email for authentication
    #[arg(long)]
    pub email: Option<String>,

    /// Password for authentication
    #[arg(long)]
    pub password: Option<String>,

    /// Project ID
    #[arg(long)]
    pub project_id: Option<u64>,

    /// Form ID
    #[arg(long)]
    pub form_id: Option<String>,

    /// Output file path (default: odk_data_<project>_<form>.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Submissions fetched per page request
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

pub fn run(args: DownloadArgs, config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let format: ExportFormat = args.format.parse()?;

    let config = config::load(&config::config_file(config_dir))?;
    let odk = merge_connection(config.odk, &args);

    if odk.base_url.is_empty() {
        bail!("ODK Central base URL not configured; use 'fieldfolio config setup' or pass --url");
    }
    if odk.email.is_empty() {
        bail!("email not configured; use 'fieldfolio config setup' or pass --email");
    }
    if odk.password.is_empty() {
        bail!("password not provided; pass --password or run 'fieldfolio config setup'");
    }

    let mut client = OdkClient::connect(&odk.base_url, &odk.email, &odk.password)?;

    println!("{} {}", "Authenticating with".dimmed(), odk.base_url);
    client.authenticate()?;

    let Some(project_id) = odk.project_id else {
        print_project_choices(&mut client)?;
        bail!("no project selected; pass --project-id or set it with 'fieldfolio config setup'");
    };

    let Some(form_id) = odk.form_id.clone() else {
        print_form_choices(&mut client, project_id)?;
        bail!("no form selected; pass --form-id or set it with 'fieldfolio config setup'");
    };

    println!(
        "{} project {} / form {}",
        "Downloading submissions from".dimmed(),
        project_id,
        form_id
    );

    let mut progress = FetchProgress::spinner();
    let submissions =
        client.fetch_submissions(project_id, &form_id, args.page_size, &mut progress)?;

    if submissions.is_empty() {
        bail!("the server returned no submissions for form '{}'", form_id);
    }

    let dataset = data::flatten(&submissions);
    println!(
        "{} {} records, {} columns",
        "Downloaded".green().bold(),
        dataset.len(),
        dataset.columns().len()
    );

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "odk_data_{}_{}.{}",
            project_id,
            form_id,
            format.extension()
        ))
    });
    data::export::write(&dataset, &output, format)?;
    println!("{} {}", "Saved to".green().bold(), output.display());

    Ok(())
}

fn merge_connection(mut odk: OdkConfig, args: &DownloadArgs) -> OdkConfig {
    if let Some(url) = &args.url {
        odk.base_url = url.clone();
    }
    if let Some(email) = &args.email {
        odk.email = email.clone();
    }
    if let Some(password) = &args.password {
        odk.password = password.clone();
    }
    if args.project_id.is_some() {
        odk.project_id = args.project_id;
    }
    if args.form_id.is_some() {
        odk.form_id = args.form_id.clone();
    }
    odk
}

fn print_project_choices(client: &mut OdkClient<HttpTransport>) -> anyhow::Result<()> {
    let projects = client.list_projects()?;
    if projects.is_empty() {
        bail!("the server has no projects visible to this account");
    }
    println!("\nAvailable projects:");
    for project in projects {
        println!("  {:>4}  {}", project.id, project.name);
    }
    Ok(())
}

fn print_form_choices(client: &mut OdkClient<HttpTransport>, project_id: u64) -> anyhow::Result<()> {
    let forms = client.list_forms(project_id)?;
    if forms.is_empty() {
        bail!("project {} has no forms", project_id);
    }
    println!("\nForms in project {}:", project_id);
    for form in forms {
        println!(
            "  {:>20}  {}",
            form.xml_form_id,
            form.name.unwrap_or_default()
        );
    }
    Ok(())
}
