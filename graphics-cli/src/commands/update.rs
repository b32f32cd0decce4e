//! `graphics update-copy`, `update-from-content`, `update-from-template`,
//! `debug-deploy` and `render`.

use anyhow::{Context, Result};
use clap::Args;

use graphics_renderer::RenderReport;

use super::Workspace;

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Graphic whose copy to download; all graphics when omitted.
    pub slug: Option<String>,
}

impl CopyArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let Some(fetched) = workspace
            .run(|wf| wf.update_copy(self.slug.as_deref()))
            .context("copy update failed")?
        else {
            return Ok(());
        };
        if fetched.is_empty() {
            println!("No copy spreadsheets downloaded.");
        }
        for slug in fetched {
            println!("✓ Updated copy for '{slug}'");
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ContentArgs {
    #[arg(default_value = "")]
    pub slug: String,
}

impl ContentArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let report = workspace
            .run(|wf| wf.update_from_content(&self.slug))
            .with_context(|| format!("content update of '{}' failed", self.slug))?;
        if let Some(report) = report {
            print_rendered("Updated content for", &self.slug, &report);
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    #[arg(default_value = "")]
    pub slug: String,

    /// Template to re-copy from graphic_templates/.
    #[arg(long, short = 't', default_value = "")]
    pub template: String,
}

impl TemplateArgs {
    pub fn run_update(self, workspace: &Workspace) -> Result<()> {
        let report = workspace
            .run(|wf| wf.update_from_template(&self.slug, &self.template))
            .with_context(|| format!("template update of '{}' failed", self.slug))?;
        if let Some(report) = report {
            print_rendered("Re-templated", &self.slug, &report);
        }
        Ok(())
    }

    pub fn run_debug(self, workspace: &Workspace) -> Result<()> {
        let report = workspace
            .run(|wf| wf.debug_deploy(&self.slug, &self.template))
            .with_context(|| format!("debug deploy of '{}' failed", self.slug))?;
        if let Some(report) = report {
            print_rendered("Re-templated", &self.slug, &report);
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[arg(default_value = "")]
    pub slug: String,
}

impl RenderArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let report = workspace
            .run(|wf| wf.render(&self.slug))
            .with_context(|| format!("render of '{}' failed", self.slug))?;
        if let Some(report) = report {
            print_rendered("Rendered", &self.slug, &report);
        }
        Ok(())
    }
}

fn print_rendered(verb: &str, slug: &str, report: &RenderReport) {
    println!(
        "✓ {verb} '{slug}' ({} written, {} unchanged)",
        report.written(),
        report.outputs.len() - report.written()
    );
}
