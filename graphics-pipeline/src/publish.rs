//! Deploy publishing: pushing a project's files to its storage target.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

use graphics_core::settings::join_key;
use graphics_core::StorageTarget;

use crate::error::{publish_io, PublishError};

/// One upload of a project tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    /// Local directory whose files are uploaded.
    pub source: PathBuf,
    pub destination: StorageTarget,
    /// Key under the target's own prefix, normally the slug.
    pub key_prefix: String,
    /// Full `Cache-Control` header value.
    pub cache_control: String,
    /// Relative paths to leave out; `dir/*` excludes a whole subtree.
    pub exclude: Vec<String>,
}

/// `max-age=<seconds>`
pub fn cache_control(max_age: u32) -> String {
    format!("max-age={max_age}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub destination: String,
    pub files: usize,
}

/// Uploads a project's output tree.
pub trait Publisher {
    fn publish(&self, request: &PublishRequest) -> Result<PublishReport, PublishError>;
}

// ---------------------------------------------------------------------------
// Upload plan
// ---------------------------------------------------------------------------

/// Does `rel` (a `/`-separated relative path) match any exclude pattern?
pub fn is_excluded(rel: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(dir) if dir.ends_with('/') => rel.starts_with(dir),
        _ => rel == pattern,
    })
}

/// Relative paths of every regular file under `source` that survives the
/// exclude patterns, sorted.
pub fn plan_upload(source: &Path, exclude: &[String]) -> Result<Vec<PathBuf>, PublishError> {
    let mut plan = Vec::new();
    for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| PublishError::Walk {
            path: source.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let key = rel.to_string_lossy().replace('\\', "/");
        if is_excluded(&key, exclude) {
            tracing::trace!("excluded from upload: {key}");
            continue;
        }
        plan.push(rel.to_path_buf());
    }
    Ok(plan)
}

// ---------------------------------------------------------------------------
// StoragePublisher
// ---------------------------------------------------------------------------

/// Publishes to S3 through the `aws` CLI, or mirrors into a local directory.
#[derive(Debug, Clone)]
pub struct StoragePublisher {
    program: String,
}

impl Default for StoragePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePublisher {
    pub fn new() -> Self {
        Self::with_program("aws")
    }

    /// Use another executable in place of `aws`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn sync_s3(
        &self,
        request: &PublishRequest,
        bucket: &str,
        prefix: &str,
    ) -> Result<(), PublishError> {
        let args = s3_sync_args(request, bucket, prefix);
        tracing::debug!("{} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| publish_io(&self.program, e))?;

        if output.status.success() {
            return Ok(());
        }
        Err(PublishError::Command {
            program: self.program.clone(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Arguments for `aws s3 sync` of one request.
pub fn s3_sync_args(request: &PublishRequest, bucket: &str, prefix: &str) -> Vec<String> {
    let mut args = vec![
        "s3".to_string(),
        "sync".to_string(),
        request.source.display().to_string(),
        format!("s3://{}", join_key(&[bucket, prefix, &request.key_prefix])),
        "--cache-control".to_string(),
        request.cache_control.clone(),
    ];
    for pattern in &request.exclude {
        args.push("--exclude".to_string());
        args.push(pattern.clone());
    }
    args
}

fn copy_plan(source: &Path, plan: &[PathBuf], destination: &Path) -> Result<(), PublishError> {
    for rel in plan {
        let target = destination.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| publish_io(parent, e))?;
        }
        fs::copy(source.join(rel), &target).map_err(|e| publish_io(&target, e))?;
    }
    Ok(())
}

impl Publisher for StoragePublisher {
    fn publish(&self, request: &PublishRequest) -> Result<PublishReport, PublishError> {
        let plan = plan_upload(&request.source, &request.exclude)?;
        let destination = request.destination.describe(&request.key_prefix);
        tracing::info!(
            "publishing {} files to {destination} ({})",
            plan.len(),
            request.cache_control
        );

        match &request.destination {
            StorageTarget::S3 { bucket, prefix } => self.sync_s3(request, bucket, prefix)?,
            StorageTarget::Directory { path } => {
                copy_plan(&request.source, &plan, &path.join(&request.key_prefix))?
            }
        }

        Ok(PublishReport {
            destination,
            files: plan.len(),
        })
    }
}
