//! Webui fragment resolution against a project tree

use std::fs;
use std::path::Path;

use annex_core::{EngineConfig, ExtensionHost, MARKUP_FILTERS};
use tempfile::TempDir;

fn write(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "<span></span>").unwrap();
}

fn host(project: &Path) -> ExtensionHost {
    ExtensionHost::new(EngineConfig::for_project(project))
}

#[test]
fn single_file_round_trips() {
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "plugins/sample/extensions/webui/sidebar-end/name.html",
    );

    let found = host(project.path()).webui_extensions("sidebar-end", &["*.html"]);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].plugin_id, "sample");
    assert!(
        found[0]
            .path
            .ends_with("sample/extensions/webui/sidebar-end/name.html")
    );
}

#[test]
fn overlapping_filters_yield_one_entry() {
    let project = TempDir::new().unwrap();
    write(project.path(), "plugins/sample/extensions/webui/top/only.html");

    let found = host(project.path()).webui_extensions("top", &["*.html", "*"]);
    assert_eq!(found.len(), 1);
}

#[test]
fn resolution_is_idempotent() {
    let project = TempDir::new().unwrap();
    write(project.path(), "usr/plugins/theme/extensions/webui/top/b.html");
    write(project.path(), "plugins/theme/extensions/webui/top/shadowed.html");
    write(project.path(), "plugins/chat/extensions/webui/top/a.htm");
    write(project.path(), "plugins/chat/extensions/webui/top/z.js");

    let host = host(project.path());
    let first = host.webui_extensions("top", MARKUP_FILTERS);
    let second = host.webui_extensions("top", MARKUP_FILTERS);
    assert_eq!(first, second);

    let listed: Vec<(&str, &str)> = first
        .iter()
        .map(|e| (e.plugin_id.as_str(), e.path.as_str()))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("theme", "usr/plugins/theme/extensions/webui/top/b.html"),
            ("chat", "plugins/chat/extensions/webui/top/a.htm"),
        ]
    );
}
