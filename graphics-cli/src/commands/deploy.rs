//! `graphics deploy <slug>`

use anyhow::{Context, Result};
use clap::Args;

use super::Workspace;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Graphic to deploy.
    #[arg(default_value = "")]
    pub slug: String,
}

impl DeployArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let Some(report) = workspace
            .run(|wf| wf.deploy_to_production(&self.slug))
            .with_context(|| format!("deploy of '{}' failed", self.slug))?
        else {
            return Ok(());
        };

        println!(
            "✓ Deployed '{}' to {} ({} files)",
            self.slug, report.destination, report.files
        );
        if let Some(env) = workspace.environment {
            if let Some(server) = &workspace.settings.target(env).server {
                println!("  https://{server}/{}/", self.slug);
            }
        }
        Ok(())
    }
}
