//! `graphics templates`

use anyhow::{Context, Result};
use colored::Colorize;

use graphics_pipeline::TemplateProvisioner;

use super::Workspace;

pub fn run(workspace: &Workspace) -> Result<()> {
    let provisioner = TemplateProvisioner::from_settings(&workspace.settings);
    let templates = provisioner
        .available_templates()
        .context("failed to list templates")?;

    if templates.is_empty() {
        println!(
            "No templates found under {}.",
            workspace.settings.templates_root().display()
        );
        return Ok(());
    }

    println!("{}", "Templates".bold());
    for template in templates {
        println!("  {template}");
    }
    Ok(())
}
