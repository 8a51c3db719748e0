//! Webui asset resolver
//!
//! Finds the UI fragments plugins place under
//! `extensions/webui/<point>/` and reports them relative to the project root,
//! ready to be served or expanded into a template anchor.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::dispatch::{EXTENSIONS_DIR, KIND_WEBUI, is_valid_segment};
use super::error::ExtensionHostError;
use super::registry::PluginRegistry;

/// Filters applied when a request names none
pub const DEFAULT_FILTERS: &[&str] = &["*"];

/// Script fragments
pub const SCRIPT_FILTERS: &[&str] = &["*.js", "*.mjs"];

/// Markup fragments
pub const MARKUP_FILTERS: &[&str] = &["*.html", "*.htm", "*.xhtml"];

/// One UI fragment contributed by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebuiExtension {
    /// Contributing plugin id
    pub plugin_id: String,
    /// Path relative to the project root, `/`-separated
    pub path: String,
}

/// A compiled filter. Filters with a `/` match the tail of the path below
/// the point directory (`sub/*.js` also finds `a/sub/x.js`); the rest match
/// the file name at any depth.
struct Filter {
    matcher: GlobMatcher,
    by_path: bool,
}

impl Filter {
    fn compile(pattern: &str) -> Result<Self, ExtensionHostError> {
        let by_path = pattern.contains('/');
        let glob = match pattern.trim_start_matches('/') {
            tail if by_path && !tail.starts_with("**/") => format!("**/{tail}"),
            tail => tail.to_string(),
        };
        let matcher = GlobBuilder::new(&glob)
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self { matcher, by_path })
    }

    fn is_match(&self, relative: &Path) -> bool {
        if self.by_path {
            self.matcher.is_match(relative)
        } else {
            relative
                .file_name()
                .is_some_and(|name| self.matcher.is_match(Path::new(name)))
        }
    }
}

fn compile_filters<S: AsRef<str>>(filters: &[S]) -> Vec<Filter> {
    let patterns: Vec<&str> = if filters.is_empty() {
        DEFAULT_FILTERS.to_vec()
    } else {
        filters.iter().map(AsRef::as_ref).collect()
    };

    patterns
        .into_iter()
        .filter_map(|pattern| match Filter::compile(pattern) {
            Ok(filter) => Some(filter),
            Err(e) => {
                tracing::warn!(filter = %pattern, error = %e, "Ignoring webui filter");
                None
            }
        })
        .collect()
}

/// Resolves webui fragments for UI anchors
#[derive(Debug, Clone)]
pub struct WebuiResolver {
    registry: PluginRegistry,
    project_root: PathBuf,
}

impl WebuiResolver {
    /// Create a resolver reporting paths relative to `project_root`
    pub fn new(registry: PluginRegistry, project_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            project_root: project_root.into(),
        }
    }

    /// Whether fragments under `root` can be expressed relative to the
    /// project root. Roots outside the project only contribute backend units.
    pub fn serves_root(&self, root: &Path) -> bool {
        relative_to(&self.project_root, root).is_ok()
    }

    /// Fragments for `point`, plugin by plugin in registry order.
    ///
    /// Within a plugin, files matched by several filters appear once, and
    /// entries are sorted by file name. An empty filter list means `["*"]`.
    /// Unknown points resolve to nothing. Plugins under a root outside the
    /// project root are skipped.
    pub fn resolve<S: AsRef<str>>(&self, point: &str, filters: &[S]) -> Vec<WebuiExtension> {
        if !is_valid_segment(point) {
            tracing::debug!(point = %point, "Not a valid webui point");
            return Vec::new();
        }

        let filters = compile_filters(filters);
        let mut extensions = Vec::new();

        for (plugin, dir) in self
            .registry
            .resolve_subpath_with_plugins(&[EXTENSIONS_DIR, KIND_WEBUI, point])
        {
            if !self.serves_root(&plugin.root) {
                tracing::debug!(
                    plugin = %plugin.id,
                    root = %plugin.root.display(),
                    "Plugin root outside project, skipping webui"
                );
                continue;
            }
            for path in matching_files(&dir, &filters) {
                match relative_to(&self.project_root, &path) {
                    Ok(relative) => extensions.push(WebuiExtension {
                        plugin_id: plugin.id.clone(),
                        path: relative,
                    }),
                    Err(e) => {
                        tracing::warn!(plugin = %plugin.id, error = %e, "Dropping webui extension");
                    }
                }
            }
        }

        extensions
    }
}

/// Files under `dir` matched by any filter, deduplicated and sorted by name
fn matching_files(dir: &Path, filters: &[Filter]) -> Vec<PathBuf> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable webui entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();

    let mut seen = HashSet::new();
    let mut matched = Vec::new();

    for filter in filters {
        for path in &files {
            let relative = path.strip_prefix(dir).unwrap_or(path);
            if filter.is_match(relative) && seen.insert(path.clone()) {
                matched.push(path.clone());
            }
        }
    }

    matched.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    matched
}

/// `path` relative to `root` with `/` separators
pub fn relative_to(root: &Path, path: &Path) -> Result<String, ExtensionHostError> {
    let error = || ExtensionHostError::RelativePath {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    };

    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => {
            let root = root.canonicalize().map_err(|_| error())?;
            let path = path.canonicalize().map_err(|_| error())?;
            path.strip_prefix(&root).map_err(|_| error())?.to_path_buf()
        }
    };

    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<&str>>>()
        .ok_or_else(error)?;
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<div></div>").unwrap();
    }

    fn resolver(project: &Path) -> WebuiResolver {
        WebuiResolver::new(PluginRegistry::for_project(project), project)
    }

    #[test]
    fn test_overlapping_filters_deduplicate() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/memory/extensions/webui/sidebar/panel.html");

        let found = resolver(project.path()).resolve("sidebar", &["*.html", "*"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].plugin_id, "memory");
        assert_eq!(
            found[0].path,
            "plugins/memory/extensions/webui/sidebar/panel.html"
        );
    }

    #[test]
    fn test_sorted_by_file_name_within_plugin() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/memory/extensions/webui/sidebar/b.html");
        file(project.path(), "plugins/memory/extensions/webui/sidebar/nested/a.html");
        file(project.path(), "plugins/memory/extensions/webui/sidebar/c.js");

        let found = resolver(project.path()).resolve("sidebar", MARKUP_FILTERS);
        let paths: Vec<&str> = found.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "plugins/memory/extensions/webui/sidebar/nested/a.html",
                "plugins/memory/extensions/webui/sidebar/b.html",
            ]
        );
    }

    #[test]
    fn test_same_name_in_two_plugins_kept() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/alpha/extensions/webui/top/x.html");
        file(project.path(), "plugins/beta/extensions/webui/top/x.html");

        let found = resolver(project.path()).resolve::<&str>("top", &[]);
        let ids: Vec<&str> = found.iter().map(|e| e.plugin_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_path_filter_matches_below_point() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/memory/extensions/webui/top/sub/a.js");
        file(project.path(), "plugins/memory/extensions/webui/top/b.js");

        let found = resolver(project.path()).resolve("top", &["sub/*.js"]);
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("top/sub/a.js"));
    }

    #[test]
    fn test_path_filter_matches_at_any_depth() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/memory/extensions/webui/top/panel/sub/deep.js");
        file(project.path(), "plugins/memory/extensions/webui/top/sub/a.js");
        file(project.path(), "plugins/memory/extensions/webui/top/panel/b.js");

        let found = resolver(project.path()).resolve("top", &["sub/*.js"]);
        let paths: Vec<&str> = found.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "plugins/memory/extensions/webui/top/sub/a.js",
                "plugins/memory/extensions/webui/top/panel/sub/deep.js",
            ]
        );

        let anchored = resolver(project.path()).resolve("top", &["**/panel/*.js"]);
        assert_eq!(anchored.len(), 1);
        assert!(anchored[0].path.ends_with("top/panel/b.js"));
    }

    #[test]
    fn test_invalid_filter_skipped() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/memory/extensions/webui/top/a.js");

        let found = resolver(project.path()).resolve("top", &["[", "*.js"]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_unknown_or_invalid_point_is_empty() {
        let project = TempDir::new().unwrap();
        file(project.path(), "plugins/memory/extensions/webui/top/a.js");

        assert!(resolver(project.path()).resolve::<&str>("missing", &[]).is_empty());
        assert!(resolver(project.path()).resolve::<&str>("../webui", &[]).is_empty());
    }

    #[test]
    fn test_roots_outside_project_serve_no_webui() {
        let project = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        file(elsewhere.path(), "memory/extensions/webui/top/a.js");
        file(project.path(), "plugins/theme/extensions/webui/top/b.js");

        let resolver = WebuiResolver::new(
            PluginRegistry::new(vec![
                elsewhere.path().to_path_buf(),
                project.path().join("plugins"),
            ]),
            project.path(),
        );
        assert!(!resolver.serves_root(elsewhere.path()));
        assert!(resolver.serves_root(&project.path().join("plugins")));

        let found = resolver.resolve::<&str>("top", &[]);
        let ids: Vec<&str> = found.iter().map(|e| e.plugin_id.as_str()).collect();
        assert_eq!(ids, vec!["theme"]);
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/proj"), Path::new("/proj/plugins/a/x.html")).unwrap(),
            "plugins/a/x.html"
        );
        assert!(matches!(
            relative_to(Path::new("/proj"), Path::new("/other/x.html")),
            Err(ExtensionHostError::RelativePath { .. })
        ));
    }
}
