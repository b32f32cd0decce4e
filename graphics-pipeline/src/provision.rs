//! Template provisioning: copying `_base` plus a template variant into a
//! project directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use graphics_core::{atomic::write_atomic, descriptor, Settings, TemplateName};

use crate::error::{provision_io, ProvisionError};

/// Suffix of the recovery copy written while re-provisioning.
pub const BACKUP_SUFFIX: &str = ".BACKUP";

/// `<project>/graphic_config.yaml.BACKUP`
pub fn backup_path(project_dir: &Path) -> PathBuf {
    project_dir.join(format!("{}{BACKUP_SUFFIX}", descriptor::DESCRIPTOR_FILE))
}

/// Recursively copy `src` into `dst`, overwriting files that already exist.
///
/// Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize, ProvisionError> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|source| ProvisionError::Walk {
            path: src.to_path_buf(),
            source,
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| provision_io(&target, e))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|e| provision_io(&target, e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// File contents, or `None` when the file does not exist.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, ProvisionError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(provision_io(path, e)),
    }
}

/// Copies template trees out of the templates directory.
#[derive(Debug, Clone)]
pub struct TemplateProvisioner {
    templates_root: PathBuf,
}

impl TemplateProvisioner {
    pub fn new(templates_root: impl Into<PathBuf>) -> Self {
        Self {
            templates_root: templates_root.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.templates_root())
    }

    pub fn template_dir(&self, template: &TemplateName) -> PathBuf {
        self.templates_root.join(template.as_str())
    }

    /// Directory of `template`, or `UnknownTemplate` when it is missing.
    pub fn require(&self, template: &TemplateName) -> Result<PathBuf, ProvisionError> {
        let dir = self.template_dir(template);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ProvisionError::UnknownTemplate {
                name: template.to_string(),
                path: dir,
            })
        }
    }

    /// Template names a project can be created from, sorted. `_base` and
    /// hidden directories are not listed.
    pub fn available_templates(&self) -> Result<Vec<TemplateName>, ProvisionError> {
        let entries = match fs::read_dir(&self.templates_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(provision_io(&self.templates_root, e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| provision_io(&self.templates_root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == TemplateName::BASE || name.starts_with('.') {
                continue;
            }
            names.push(TemplateName::from(name));
        }
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    /// Create `project_dir` and fill it from `_base` then `template`.
    pub fn scaffold(
        &self,
        project_dir: &Path,
        template: &TemplateName,
    ) -> Result<(), ProvisionError> {
        let base = self.require(&TemplateName::from(TemplateName::BASE))?;
        let variant = self.require(template)?;
        fs::create_dir_all(project_dir).map_err(|e| provision_io(project_dir, e))?;
        let n = copy_tree(&base, project_dir)? + copy_tree(&variant, project_dir)?;
        tracing::info!(
            "scaffolded {} from '{template}' ({n} files)",
            project_dir.display()
        );
        Ok(())
    }

    /// Overwrite an existing project with `_base` and `template`, keeping its
    /// descriptor byte-for-byte.
    ///
    /// Nothing is touched unless the project and both template directories
    /// exist. While the copy runs, the original descriptor also sits in
    /// `graphic_config.yaml.BACKUP`; an interrupted run leaves that file and
    /// the template's descriptor behind. A later run treats a leftover backup
    /// as the project's descriptor and restores it.
    pub fn reprovision(
        &self,
        project_dir: &Path,
        template: &TemplateName,
    ) -> Result<(), ProvisionError> {
        if !project_dir.is_dir() {
            return Err(ProvisionError::MissingProject {
                path: project_dir.to_path_buf(),
            });
        }
        let base = self.require(&TemplateName::from(TemplateName::BASE))?;
        let variant = self.require(template)?;

        let descriptor_file = descriptor::descriptor_path(project_dir);
        let backup = backup_path(project_dir);
        let snapshot = match read_optional(&backup)? {
            Some(bytes) => {
                tracing::warn!(
                    "{} left by an interrupted run; restoring the descriptor from it",
                    backup.display()
                );
                Some(bytes)
            }
            None => {
                let snapshot = read_optional(&descriptor_file)?;
                if let Some(bytes) = &snapshot {
                    fs::write(&backup, bytes).map_err(|e| provision_io(&backup, e))?;
                }
                snapshot
            }
        };

        copy_tree(&base, project_dir)?;
        copy_tree(&variant, project_dir)?;

        if let Some(bytes) = snapshot {
            write_atomic(&descriptor_file, bytes)?;
            fs::remove_file(&backup).map_err(|e| provision_io(&backup, e))?;
        }
        tracing::info!("re-provisioned {} from '{template}'", project_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn templates(tmp: &TempDir) -> TemplateProvisioner {
        let root = tmp.path().join("graphic_templates");
        write(&root, "_base/base.js", "base");
        write(&root, "_base/child_template.html", "base child");
        write(&root, "_base/assets/app.css", "body{}");
        write(&root, "bar_chart/child_template.html", "bar child");
        write(&root, "bar_chart/graphic_config.yaml", "copy_document_key: template-key\n");
        write(&root, "map/child_template.html", "map child");
        write(&root, ".git/HEAD", "ref");
        TemplateProvisioner::new(root)
    }

    #[test]
    fn lists_templates_without_base() {
        let tmp = TempDir::new().unwrap();
        let names: Vec<String> = templates(&tmp)
            .available_templates()
            .unwrap()
            .into_iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(names, vec!["bar_chart", "map"]);
    }

    #[test]
    fn missing_templates_root_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let provisioner = TemplateProvisioner::new(tmp.path().join("nope"));
        assert!(provisioner.available_templates().unwrap().is_empty());
    }

    #[test]
    fn scaffold_layers_template_over_base() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("graphics/jobs");
        templates(&tmp)
            .scaffold(&project, &TemplateName::from("bar_chart"))
            .unwrap();

        assert_eq!(fs::read_to_string(project.join("base.js")).unwrap(), "base");
        assert_eq!(
            fs::read_to_string(project.join("child_template.html")).unwrap(),
            "bar child"
        );
        assert!(project.join("assets/app.css").exists());
    }

    #[test]
    fn scaffold_unknown_template_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("graphics/jobs");
        let err = templates(&tmp)
            .scaffold(&project, &TemplateName::from("pie"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownTemplate { .. }));
        assert!(!project.exists());
    }

    #[test]
    fn reprovision_keeps_descriptor_and_overwrites_the_rest() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("graphics/jobs");
        let original = "copy_document_key: project-key\n# hand edited\ntitle:  Jobs\n";
        write(&project, "graphic_config.yaml", original);
        write(&project, "child_template.html", "stale");
        write(&project, "notes.txt", "mine");

        templates(&tmp)
            .reprovision(&project, &TemplateName::from("bar_chart"))
            .unwrap();

        assert_eq!(
            fs::read(project.join("graphic_config.yaml")).unwrap(),
            original.as_bytes()
        );
        assert_eq!(
            fs::read_to_string(project.join("child_template.html")).unwrap(),
            "bar child"
        );
        assert_eq!(fs::read_to_string(project.join("notes.txt")).unwrap(), "mine");
        assert!(!backup_path(&project).exists());
    }

    #[test]
    fn reprovision_after_interrupted_run_restores_backup() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("graphics/jobs");
        write(&project, "graphic_config.yaml", "copy_document_key: template-key\n");
        write(&project, "graphic_config.yaml.BACKUP", "copy_document_key: PROJECT-KEY\n");

        templates(&tmp)
            .reprovision(&project, &TemplateName::from("bar_chart"))
            .unwrap();

        assert_eq!(
            fs::read_to_string(project.join("graphic_config.yaml")).unwrap(),
            "copy_document_key: PROJECT-KEY\n"
        );
        assert!(!backup_path(&project).exists());
    }

    #[test]
    fn reprovision_without_descriptor_takes_templates() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("graphics/jobs");
        fs::create_dir_all(&project).unwrap();

        templates(&tmp)
            .reprovision(&project, &TemplateName::from("bar_chart"))
            .unwrap();
        assert_eq!(
            fs::read_to_string(project.join("graphic_config.yaml")).unwrap(),
            "copy_document_key: template-key\n"
        );
    }

    #[test]
    fn reprovision_unknown_template_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("graphics/jobs");
        write(&project, "child_template.html", "stale");

        let err = templates(&tmp)
            .reprovision(&project, &TemplateName::from("pie"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownTemplate { .. }));
        assert_eq!(
            fs::read_to_string(project.join("child_template.html")).unwrap(),
            "stale"
        );
        assert!(!project.join("base.js").exists());
    }

    #[test]
    fn reprovision_missing_project_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = templates(&tmp)
            .reprovision(&tmp.path().join("graphics/none"), &TemplateName::from("map"))
            .unwrap_err();
        assert!(matches!(err, ProvisionError::MissingProject { .. }));
    }
}
