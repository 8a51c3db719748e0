//! Plugin registry - discovers plugin directories across priority-ordered roots
//!
//! The registry keeps no cache: every query walks the roots again, so the
//! answer always reflects the filesystem as it is now.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use annex_extension_api::PluginManifest;
use serde::Serialize;

use super::error::ExtensionHostError;

/// A plugin directory found under one of the roots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plugin {
    /// Stable identity, the directory name
    pub id: String,
    /// Display name (manifest name, or the id)
    pub name: String,
    /// Absolute plugin directory
    pub path: PathBuf,
    /// Root the plugin was found under
    pub root: PathBuf,
    /// Manifest contents, default when the plugin has none
    pub manifest: PluginManifest,
}

impl Plugin {
    fn discover(id: String, path: PathBuf, root: &Path) -> Self {
        let manifest = match load_manifest(&path) {
            Ok(manifest) => manifest.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(plugin = %id, error = %e, "Ignoring plugin manifest");
                PluginManifest::default()
            }
        };
        let name = manifest.name.clone().unwrap_or_else(|| id.clone());

        Self {
            id,
            name,
            path,
            root: root.to_path_buf(),
            manifest,
        }
    }
}

/// Read `plugin.toml` from a plugin directory, if there is one
fn load_manifest(dir: &Path) -> Result<Option<PluginManifest>, ExtensionHostError> {
    let path = dir.join(PluginManifest::FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let manifest = toml::from_str(&content).map_err(|e| ExtensionHostError::Manifest {
        path,
        message: e.to_string(),
    })?;
    Ok(Some(manifest))
}

/// Registry of plugins merged from several roots.
///
/// Roots are listed highest priority first. When two roots hold a plugin
/// directory with the same name, the one under the earlier root wins and the
/// other is invisible.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    roots: Vec<PathBuf>,
}

impl PluginRegistry {
    /// Create a registry over the given roots (highest priority first)
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Registry over a project's user overlay and bundled plugin roots
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(annex_paths::plugin_roots(project_root))
    }

    /// Plugin roots, highest priority first
    pub fn list_roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Discover plugins, unique by id.
    ///
    /// Roots are walked in priority order and, within a root, directories in
    /// lexicographic name order. Hidden directories (leading `.`) and plain
    /// files are skipped. A missing root contributes nothing.
    pub fn list_plugins(&self) -> Vec<Plugin> {
        let mut seen = HashSet::new();
        let mut plugins = Vec::new();

        for root in &self.roots {
            for (id, path) in plugin_dirs(root) {
                if seen.insert(id.clone()) {
                    plugins.push(Plugin::discover(id, path, root));
                }
            }
        }

        plugins
    }

    /// Find a single plugin by id
    pub fn find_plugin(&self, id: &str) -> Option<Plugin> {
        if id.is_empty() {
            return None;
        }
        self.list_plugins().into_iter().find(|p| p.id == id)
    }

    /// Existing directories `<plugin>/<segments...>`, one per plugin that has it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// registry.resolve_subpath(&["extensions", "backend", "monologue_end"]);
    /// // -> ["/proj/plugins/memory/extensions/backend/monologue_end", ...]
    /// ```
    pub fn resolve_subpath(&self, segments: &[&str]) -> Vec<PathBuf> {
        self.resolve_subpath_with_plugins(segments)
            .into_iter()
            .map(|(_, path)| path)
            .collect()
    }

    /// Like [`resolve_subpath`](Self::resolve_subpath), keeping the owning plugin
    pub fn resolve_subpath_with_plugins(&self, segments: &[&str]) -> Vec<(Plugin, PathBuf)> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for plugin in self.list_plugins() {
            let candidate = segments
                .iter()
                .fold(plugin.path.clone(), |path, segment| path.join(segment));
            if candidate.is_dir() && seen.insert(candidate.clone()) {
                found.push((plugin, candidate));
            }
        }

        found
    }
}

/// Visible plugin directories of one root, sorted by name
fn plugin_dirs(root: &Path) -> Vec<(String, PathBuf)> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "Plugin root not readable");
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_dir() {
                return None;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(path = %path.display(), "Skipping non UTF-8 plugin directory");
                return None;
            };
            if name.starts_with('.') {
                return None;
            }
            Some((name, path))
        })
        .collect();

    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn mkdirs(root: &Path, rel: &str) {
        fs::create_dir_all(root.join(rel)).unwrap();
    }

    #[test]
    fn test_first_root_wins_on_id_conflict() {
        let user = TempDir::new().unwrap();
        let bundled = TempDir::new().unwrap();
        mkdirs(user.path(), "memory");
        mkdirs(bundled.path(), "memory");
        mkdirs(bundled.path(), "browser");

        let registry =
            PluginRegistry::new(vec![user.path().to_path_buf(), bundled.path().to_path_buf()]);
        let plugins = registry.list_plugins();

        let memory: Vec<_> = plugins.iter().filter(|p| p.id == "memory").collect();
        assert_eq!(memory.len(), 1);
        assert!(memory[0].path.starts_with(user.path()));
        assert_eq!(memory[0].root, user.path());
        assert!(plugins.iter().any(|p| p.id == "browser"));
    }

    #[test]
    fn test_plugins_ordered_by_root_then_name() {
        let user = TempDir::new().unwrap();
        let bundled = TempDir::new().unwrap();
        mkdirs(user.path(), "zeta");
        mkdirs(bundled.path(), "beta");
        mkdirs(bundled.path(), "alpha");

        let registry =
            PluginRegistry::new(vec![user.path().to_path_buf(), bundled.path().to_path_buf()]);
        let ids: Vec<String> = registry.list_plugins().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn test_hidden_dirs_and_files_skipped() {
        let root = TempDir::new().unwrap();
        mkdirs(root.path(), ".git");
        mkdirs(root.path(), "memory");
        fs::write(root.path().join("README.md"), "not a plugin").unwrap();

        let registry = PluginRegistry::new(vec![root.path().to_path_buf()]);
        let ids: Vec<String> = registry.list_plugins().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["memory"]);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let registry = PluginRegistry::new(vec![PathBuf::from("/nonexistent/annex/plugins")]);
        assert!(registry.list_plugins().is_empty());
        assert!(registry.find_plugin("memory").is_none());
    }

    #[test]
    fn test_find_plugin() {
        let root = TempDir::new().unwrap();
        mkdirs(root.path(), "memory");

        let registry = PluginRegistry::new(vec![root.path().to_path_buf()]);
        assert_eq!(registry.find_plugin("memory").unwrap().id, "memory");
        assert!(registry.find_plugin("unknown").is_none());
        assert!(registry.find_plugin("").is_none());
    }

    #[test]
    fn test_resolve_subpath_omits_plugins_without_it() {
        let root = TempDir::new().unwrap();
        mkdirs(root.path(), "memory/extensions/backend/monologue_start");
        mkdirs(root.path(), "browser/extensions/webui");

        let registry = PluginRegistry::new(vec![root.path().to_path_buf()]);
        let paths = registry.resolve_subpath(&["extensions", "backend", "monologue_start"]);
        assert_eq!(
            paths,
            vec![root.path().join("memory/extensions/backend/monologue_start")]
        );
    }

    #[test]
    fn test_resolve_subpath_without_segments_lists_plugin_dirs() {
        let root = TempDir::new().unwrap();
        mkdirs(root.path(), "a");
        mkdirs(root.path(), "b");

        let registry = PluginRegistry::new(vec![root.path().to_path_buf()]);
        assert_eq!(
            registry.resolve_subpath(&[]),
            vec![root.path().join("a"), root.path().join("b")]
        );
    }

    #[test]
    fn test_manifest_supplies_display_name() {
        let root = TempDir::new().unwrap();
        mkdirs(root.path(), "memory");
        fs::write(
            root.path().join("memory/plugin.toml"),
            "name = \"Long-term Memory\"\nversion = \"0.3.0\"\n",
        )
        .unwrap();

        let registry = PluginRegistry::new(vec![root.path().to_path_buf()]);
        let plugin = registry.find_plugin("memory").unwrap();
        assert_eq!(plugin.id, "memory");
        assert_eq!(plugin.name, "Long-term Memory");
        assert_eq!(plugin.manifest.version.as_deref(), Some("0.3.0"));
    }

    #[test]
    fn test_malformed_manifest_falls_back_to_id() {
        let root = TempDir::new().unwrap();
        mkdirs(root.path(), "memory");
        fs::write(root.path().join("memory/plugin.toml"), "name = [unclosed").unwrap();

        let registry = PluginRegistry::new(vec![root.path().to_path_buf()]);
        let plugin = registry.find_plugin("memory").unwrap();
        assert_eq!(plugin.name, "memory");
        assert_eq!(plugin.manifest, PluginManifest::default());
    }

    #[test]
    fn test_for_project_roots() {
        let registry = PluginRegistry::for_project(Path::new("/proj"));
        assert_eq!(
            registry.list_roots(),
            &[
                PathBuf::from("/proj/usr/plugins"),
                PathBuf::from("/proj/plugins")
            ]
        );
    }
}
