//! Runs the built `annex` binary against a temporary project

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Run annex with config lookups isolated inside `home`
fn annex(home: &Path, project: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_annex"))
        .arg("--project")
        .arg(project)
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("ANNEX_PROJECT_CONFIG_DIR", home.join("project-config"))
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run annex")
}

fn json_stdout(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "annex failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn plugins_list_json_respects_root_priority() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write(project.path(), "usr/plugins/memory/plugin.toml", "name = \"Memory (user)\"\n");
    write(project.path(), "plugins/memory/plugin.toml", "name = \"Memory\"\n");
    write(project.path(), "plugins/browser/README.md", "");

    let plugins = json_stdout(&annex(home.path(), project.path(), &["plugins", "list", "--json"]));
    let listed: Vec<(&str, &str)> = plugins
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["id"].as_str().unwrap(), p["name"].as_str().unwrap()))
        .collect();
    assert_eq!(listed, vec![("memory", "Memory (user)"), ("browser", "browser")]);
}

#[test]
fn plugins_info_unknown_fails() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let output = annex(home.path(), project.path(), &["plugins", "info", "missing"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Plugin not found"));
}

#[test]
fn webui_prints_lookup_result() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "plugins/memory/extensions/webui/sidebar-top/panel.html",
        "<p></p>",
    );

    let result = json_stdout(&annex(
        home.path(),
        project.path(),
        &["webui", "sidebar-top", "--markup"],
    ));
    assert_eq!(
        result["extensions"][0]["path"],
        "plugins/memory/extensions/webui/sidebar-top/panel.html"
    );
    assert_eq!(result["extensions"][0]["plugin_id"], "memory");
}

#[test]
fn dispatch_of_empty_point_reports_nothing() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let result = json_stdout(&annex(
        home.path(),
        project.path(),
        &["extensions", "dispatch", "monologue_start"],
    ));
    assert_eq!(result["report"]["point"], "monologue_start");
    assert_eq!(result["report"]["invoked"], serde_json::json!([]));
}

#[test]
fn config_show_reads_project_layer() {
    let home = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write(
        home.path(),
        "project-config/config.toml",
        "[deferred]\ndelayed_mode = true\n",
    );

    let output = annex(home.path(), project.path(), &["config", "show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("delayed_mode = true"));
    assert!(stdout.contains("port = 7433"));
}
