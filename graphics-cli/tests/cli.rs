use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn graphics_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("graphics"));
    cmd.arg("--root")
        .arg(root)
        .env("HOME", root)
        .env("USERPROFILE", root)
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "warn");
    cmd
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

/// Workspace with `_base`, `bar_chart`, a debug spreadsheet and directory
/// deploy targets under `mirror/`.
fn workspace() -> TempDir {
    let root = TempDir::new().expect("root");
    write(
        root.path(),
        "graphics.yaml",
        r#"
default_max_age: 60
credentials_path: creds.json
targets:
  production:
    server: apps.example.org
    storage: { kind: directory, path: mirror/production }
  staging:
    storage: { kind: directory, path: mirror/staging }
"#,
    );
    write(root.path(), "graphic_templates/_base/js/base.js", "// base");
    write(
        root.path(),
        "graphic_templates/bar_chart/child_template.html",
        "<h1>{{ config.title }}</h1>{% if copy.available %}<p>{{ copy.file }}</p>{% endif %}",
    );
    write(
        root.path(),
        "graphic_templates/bar_chart/graphic_config.yaml",
        "copy_document_key: template-key\ntitle: Bar chart\n",
    );
    write(root.path(), "graphic_templates/bar_chart/assets/bars.svg", "<svg/>");
    write(root.path(), "debug.xlsx", "debug-sheet");
    root
}

fn create_debug_project(root: &Path, slug: &str) {
    graphics_cmd(root)
        .args(["new", slug, "--template", "bar_chart", "--debug"])
        .assert()
        .success();
}

#[test]
fn templates_lists_variants_without_base() {
    let root = workspace();
    graphics_cmd(root.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(contains("bar_chart"))
        .stdout(contains("_base").not());
}

#[test]
fn new_debug_project_gets_local_spreadsheet() {
    let root = workspace();
    graphics_cmd(root.path())
        .args(["new", "jobs", "--template", "bar_chart", "--debug"])
        .assert()
        .success()
        .stdout(contains("Created 'jobs' from template 'bar_chart'"));

    let project = root.path().join("graphics/jobs");
    assert_eq!(fs::read_to_string(project.join("jobs.xlsx")).unwrap(), "debug-sheet");
    assert!(project.join("js/base.js").exists());
    assert!(project.join("graphic_config.yaml").exists());
}

#[test]
fn new_debug_without_local_spreadsheet_leaves_no_project() {
    let root = workspace();
    fs::remove_file(root.path().join("debug.xlsx")).unwrap();

    graphics_cmd(root.path())
        .args(["new", "jobs", "--template", "bar_chart", "--debug"])
        .assert()
        .failure()
        .stderr(contains("debug copy spreadsheet not found"));
    assert!(!root.path().join("graphics/jobs").exists());

    write(root.path(), "debug.xlsx", "debug-sheet");
    create_debug_project(root.path(), "jobs");
}

#[test]
fn new_on_existing_slug_fails_and_keeps_files() {
    let root = workspace();
    write(root.path(), "graphics/jobs/notes.txt", "mine");

    graphics_cmd(root.path())
        .args(["new", "jobs", "--template", "bar_chart", "--debug"])
        .assert()
        .failure()
        .stderr(contains("Directory already exists"));
    assert!(!root.path().join("graphics/jobs/js").exists());
}

#[test]
fn new_with_unknown_template_fails() {
    let root = workspace();
    graphics_cmd(root.path())
        .args(["new", "jobs", "--template", "pie_chart", "--debug"])
        .assert()
        .failure()
        .stderr(contains("pie_chart"));
    assert!(!root.path().join("graphics/jobs").exists());
}

#[test]
fn workflow_without_environment_fails() {
    let root = workspace();
    graphics_cmd(root.path())
        .args(["update-from-content", "jobs"])
        .assert()
        .failure()
        .stderr(contains("no environment selected"));
}

#[test]
fn environment_is_checked_before_arguments() {
    let root = workspace();
    graphics_cmd(root.path())
        .arg("update-from-content")
        .assert()
        .failure()
        .stderr(contains("no environment selected"));
}

#[test]
fn missing_slug_prints_usage_and_exits_zero() {
    let root = workspace();
    graphics_cmd(root.path())
        .args(["--env", "staging", "update-from-content"])
        .assert()
        .success()
        .stdout(contains("You must specify a project slug"));
    assert!(!root.path().join("graphics").exists());
}

#[test]
fn missing_template_prints_usage() {
    let root = workspace();
    create_debug_project(root.path(), "jobs");
    graphics_cmd(root.path())
        .args(["--env", "staging", "update-from-template", "jobs"])
        .assert()
        .success()
        .stdout(contains("You must specify a project slug and template"));
    assert!(!root.path().join("graphics/jobs/meta.json").exists());
}

#[test]
fn render_writes_html_without_meta() {
    let root = workspace();
    create_debug_project(root.path(), "jobs");

    graphics_cmd(root.path())
        .args(["--env", "staging", "render", "jobs"])
        .assert()
        .success()
        .stdout(contains("Rendered 'jobs'"));

    let html = fs::read_to_string(root.path().join("graphics/jobs/child.html")).unwrap();
    assert_eq!(html, "<h1>Bar chart</h1><p>jobs.xlsx</p>");
    assert!(!root.path().join("graphics/jobs/meta.json").exists());
}

#[test]
fn template_update_records_template_and_keeps_descriptor() {
    let root = workspace();
    create_debug_project(root.path(), "jobs");
    let descriptor = root.path().join("graphics/jobs/graphic_config.yaml");
    fs::write(&descriptor, "title: Edited by hand\n").unwrap();

    graphics_cmd(root.path())
        .args(["--env", "staging", "update-from-template", "jobs", "--template", "bar_chart"])
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&descriptor).unwrap(), "title: Edited by hand\n");
    let meta: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.path().join("graphics/jobs/meta.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(meta["staging"]["template"]["type"], "bar_chart");
    assert_eq!(meta["production"]["date"], "");
}

#[test]
fn deploy_mirrors_project_and_records_production_date() {
    let root = workspace();
    create_debug_project(root.path(), "jobs");

    graphics_cmd(root.path())
        .args(["--env", "production", "deploy", "jobs"])
        .assert()
        .success()
        .stdout(contains("Deployed 'jobs'"))
        .stdout(contains("https://apps.example.org/jobs/"));

    let mirror = root.path().join("mirror/production/jobs");
    assert!(mirror.join("child_template.html").exists());
    assert!(mirror.join("js/base.js").exists());
    assert!(!mirror.join("assets").exists());

    let meta: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.path().join("graphics/jobs/meta.json")).unwrap(),
    )
    .unwrap();
    assert!(meta["production"]["date"].is_i64());
    assert_eq!(meta["staging"]["content"]["date"], "");
}

#[test]
fn deploy_unknown_project_fails() {
    let root = workspace();
    graphics_cmd(root.path())
        .args(["--env", "production", "deploy", "nope"])
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}

#[test]
fn status_json_reports_each_graphic() {
    let root = workspace();
    create_debug_project(root.path(), "jobs");
    create_debug_project(root.path(), "housing");
    graphics_cmd(root.path())
        .args(["--env", "production", "deploy", "jobs"])
        .assert()
        .success();

    let output = graphics_cmd(root.path())
        .args(["status", "--json"])
        .output()
        .expect("status");
    assert!(output.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");

    assert_eq!(payload["graphics"], 2);
    let projects = payload["projects"].as_array().unwrap();
    assert_eq!(projects[0]["slug"], "housing");
    assert_eq!(projects[0]["state"], "never_deployed");
    assert_eq!(projects[1]["slug"], "jobs");
    assert_eq!(projects[1]["state"], "live");
    assert_eq!(projects[1]["has_copy_key"], true);
}

#[test]
fn status_table_on_empty_workspace() {
    let root = workspace();
    graphics_cmd(root.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("0 graphics"))
        .stdout(contains("No graphics yet"));
}
