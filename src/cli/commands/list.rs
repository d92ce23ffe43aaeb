use crate::client::OdkClient;
use crate::config;
use anyhow::bail;
use clap::Args;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// ODK Central base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Email for authentication
    #[arg(long)]
    pub email: Option<String>,

    /// Password for authentication
    #[arg(long)]
    pub password: Option<String>,

    /// Project ID to list forms for
    #[arg(long)]
    pub project_id: Option<u64>,
}

pub fn run(args: ListArgs, config_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = config::load(&config::config_file(config_dir))?;
    let mut odk = config.odk;
    if let Some(url) = args.url {
        odk.base_url = url;
    }
    if let Some(email) = args.email {
        odk.email = email;
    }
    if let Some(password) = args.password {
        odk.password = password;
    }

    if !odk.is_complete() {
        bail!(
            "ODK Central credentials not configured; run 'fieldfolio config setup' \
             or pass --url, --email and --password"
        );
    }

    let mut client = OdkClient::connect(&odk.base_url, &odk.email, &odk.password)?;
    client.authenticate()?;

    let projects = client.list_projects()?;
    if projects.is_empty() {
        println!("No projects visible to this account.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Project ID").add_attribute(Attribute::Bold).fg(Color::Green),
        Cell::new("Name").add_attribute(Attribute::Bold).fg(Color::Green),
    ]);
    for project in &projects {
        table.add_row(vec![
            Cell::new(project.id.to_string()),
            Cell::new(&project.name),
        ]);
    }
    println!("{}", table);

    if let Some(project_id) = args.project_id.or(odk.project_id) {
        let forms = client.list_forms(project_id)?;
        if forms.is_empty() {
            println!("\nProject {} has no forms.", project_id);
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Form ID").add_attribute(Attribute::Bold).fg(Color::Green),
            Cell::new("Name").add_attribute(Attribute::Bold).fg(Color::Green),
        ]);
        for form in &forms {
            table.add_row(vec![
                Cell::new(&form.xml_form_id),
                Cell::new(form.name.clone().unwrap_or_default()),
            ]);
        }
        println!("\nForms in project {}:", project_id);
        println!("{}", table);
    }

    Ok(())
}
