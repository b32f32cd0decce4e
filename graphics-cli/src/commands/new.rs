//! `graphics new <slug> [--template <name>] [--debug]`

use anyhow::{Context, Result};
use clap::Args;

use graphics_pipeline::{copy::view_url, Bootstrap, InteractiveGate};

use super::{usage_or, Workspace};

/// Create a graphic from `_base` plus a template.
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Directory name of the new graphic under graphics/.
    #[arg(default_value = "")]
    pub slug: String,

    /// Template under graphic_templates/.
    #[arg(long, short = 't', default_value = "graphic")]
    pub template: String,

    /// Copy the local debug spreadsheet instead of creating one remotely.
    #[arg(long)]
    pub debug: bool,
}

impl NewArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let settings = &workspace.settings;
        let gate = InteractiveGate::from_settings(settings)
            .context("cannot locate the credentials file")?;
        let drive = workspace.drive_client();
        let bootstrap = Bootstrap::new(settings, &gate, &drive, &drive);

        let Some(created) = usage_or(bootstrap.create_project(
            &self.slug,
            &self.template,
            self.debug,
        ))
        .with_context(|| format!("failed to create '{}'", self.slug))?
        else {
            return Ok(());
        };

        println!(
            "✓ Created '{}' from template '{}'",
            created.slug, created.template
        );
        println!("  {}", created.path.display());
        if let Some(key) = &created.document_key {
            println!("  Spreadsheet: {}", view_url(key));
        }
        if let Some(copy) = &created.copy_path {
            println!("  Copy: {}", copy.display());
        }
        Ok(())
    }
}
