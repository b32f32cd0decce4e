//! `graphics status`: update and deploy dates per graphic.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use graphics_core::{descriptor, metadata::Stamp, MetadataRecord, MetadataStore, Slug};
use graphics_pipeline::list_projects;

use super::Workspace;

/// Arguments for `graphics status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let graphics_root = workspace.settings.graphics_root();
        let mut slugs = list_projects(&graphics_root)
            .with_context(|| format!("failed to list {}", graphics_root.display()))?;
        slugs.sort();

        let store = MetadataStore::new(&graphics_root);
        let rows = slugs
            .into_iter()
            .map(|slug| project_status(workspace, &store, slug))
            .collect::<Vec<_>>();

        if self.json {
            return print_json(rows);
        }
        print_table(rows);
        Ok(())
    }
}

/// Where a graphic stands relative to its last production deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum DeployState {
    NeverDeployed,
    Live,
    Pending,
}

#[derive(Debug, Clone, Serialize)]
struct ProjectStatus {
    slug: String,
    state: DeployState,
    template: String,
    has_copy_key: bool,
    meta: MetadataRecord,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "graphic")]
    slug: String,
    #[tabled(rename = "state")]
    state: String,
    #[tabled(rename = "template")]
    template: String,
    #[tabled(rename = "content")]
    content: String,
    #[tabled(rename = "template update")]
    template_update: String,
    #[tabled(rename = "deployed")]
    deployed: String,
}

fn project_status(workspace: &Workspace, store: &MetadataStore, slug: Slug) -> ProjectStatus {
    let meta = store.read(&slug);
    let has_copy_key = descriptor::load_at(&workspace.settings.project_dir(&slug))
        .ok()
        .flatten()
        .is_some_and(|config| config.document_key().is_some());
    ProjectStatus {
        state: deploy_state(&meta),
        template: meta.staging.template.template_type.clone(),
        slug: slug.to_string(),
        has_copy_key,
        meta,
    }
}

fn deploy_state(meta: &MetadataRecord) -> DeployState {
    let Some(deployed) = meta.production.date.0 else {
        return DeployState::NeverDeployed;
    };
    let staged = [meta.staging.content.date.0, meta.staging.template.date.0]
        .into_iter()
        .flatten()
        .max();
    match staged {
        Some(staged) if staged > deployed => DeployState::Pending,
        _ => DeployState::Live,
    }
}

fn format_stamp(stamp: &Stamp) -> String {
    stamp
        .0
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn print_json(rows: Vec<ProjectStatus>) -> Result<()> {
    #[derive(Serialize)]
    struct Payload {
        graphics: usize,
        pending: usize,
        projects: Vec<ProjectStatus>,
    }

    let payload = Payload {
        graphics: rows.len(),
        pending: rows
            .iter()
            .filter(|r| r.state == DeployState::Pending)
            .count(),
        projects: rows,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<ProjectStatus>) {
    let pending = rows
        .iter()
        .filter(|r| r.state == DeployState::Pending)
        .count();
    println!(
        "graphics v{} | {} graphics | {} pending deploy",
        env!("CARGO_PKG_VERSION"),
        rows.len(),
        pending,
    );

    if rows.is_empty() {
        println!("No graphics yet. Create one with 'graphics new <slug>'.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            state: format!("{} {}", state_indicator(row.state), state_label(row.state)),
            template: if row.template.is_empty() {
                "-".to_string()
            } else {
                row.template
            },
            content: format!(
                "{}{}",
                format_stamp(&row.meta.staging.content.date),
                if row.has_copy_key { "" } else { " (no copy)" }
            ),
            template_update: format_stamp(&row.meta.staging.template.date),
            deployed: format_stamp(&row.meta.production.date),
            slug: row.slug,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!("Run 'graphics --env production deploy <slug>' to publish pending graphics.");
    }
}

fn state_label(state: DeployState) -> &'static str {
    match state {
        DeployState::NeverDeployed => "NEW",
        DeployState::Live => "LIVE",
        DeployState::Pending => "PENDING",
    }
}

fn state_indicator(state: DeployState) -> String {
    match state {
        DeployState::NeverDeployed => "■".bright_black().bold().to_string(),
        DeployState::Live => "■".green().bold().to_string(),
        DeployState::Pending => "■".yellow().bold().to_string(),
    }
}
