//! graphics: scaffold, update and deploy data-journalism graphics.
//!
//! # Usage
//!
//! ```text
//! graphics [--root <dir>] [--env production|staging] <command>
//!
//! graphics new <slug> [--template <name>] [--debug]
//! graphics templates
//! graphics update-copy [slug]
//! graphics update-from-content <slug>
//! graphics update-from-template <slug> --template <name>
//! graphics debug-deploy <slug> --template <name>
//! graphics render <slug>
//! graphics deploy <slug>
//! graphics status [--json]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    deploy::DeployArgs,
    new::NewArgs,
    status::StatusArgs,
    update::{ContentArgs, CopyArgs, RenderArgs, TemplateArgs},
    Workspace,
};
use graphics_core::Environment;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "graphics",
    version,
    about = "Create, update and deploy data-journalism graphics",
    long_about = None,
)]
struct Cli {
    /// Workspace root holding graphics.yaml, graphics/ and graphic_templates/.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Target environment: production | staging.
    #[arg(long, global = true, value_name = "ENV")]
    env: Option<Environment>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new graphic from a template.
    New(NewArgs),

    /// List the templates a graphic can be created from.
    Templates,

    /// Download the copy spreadsheet for one graphic, or for all of them.
    UpdateCopy(CopyArgs),

    /// Fetch the latest copy, re-render and record a content update.
    UpdateFromContent(ContentArgs),

    /// Re-copy template files (keeping graphic_config.yaml) and re-render.
    UpdateFromTemplate(TemplateArgs),

    /// Like update-from-template, without touching the copy spreadsheet.
    DebugDeploy(TemplateArgs),

    /// Render templates only.
    Render(RenderArgs),

    /// Upload a graphic to the environment's storage target.
    Deploy(DeployArgs),

    /// Show update and deploy dates for every graphic.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let workspace = Workspace::load(&cli.root, cli.env)?;

    match cli.command {
        Commands::New(args) => args.run(&workspace),
        Commands::Templates => commands::templates::run(&workspace),
        Commands::UpdateCopy(args) => args.run(&workspace),
        Commands::UpdateFromContent(args) => args.run(&workspace),
        Commands::UpdateFromTemplate(args) => args.run_update(&workspace),
        Commands::DebugDeploy(args) => args.run_debug(&workspace),
        Commands::Render(args) => args.run(&workspace),
        Commands::Deploy(args) => args.run(&workspace),
        Commands::Status(args) => args.run(&workspace),
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
