//! Engine configuration

use std::path::PathBuf;

use annex_extension_api::DeferredConfig;
use serde::{Deserialize, Serialize};

/// Where plugins are looked up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Project root; defaults to `$ANNEX_PROJECT_ROOT` or the current directory
    pub project_root: Option<PathBuf>,
    /// Plugin roots, highest priority first. Relative roots hang off the
    /// project root. Defaults to `usr/plugins` then `plugins`.
    ///
    /// A root outside the project root contributes backend units only: its
    /// webui fragments have no project-relative path to be served from.
    pub roots: Option<Vec<PathBuf>>,
}

/// Host built-in extensions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Built-in `<kind>/<point>/` tree; defaults to `<project>/extensions`
    pub builtin_dir: Option<PathBuf>,
}

/// Configuration of the extension engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub plugins: PluginsConfig,
    pub extensions: ExtensionsConfig,
    pub deferred: DeferredConfig,
}

impl EngineConfig {
    /// Engine rooted at `project_root` with default layout
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        Self {
            plugins: PluginsConfig {
                project_root: Some(project_root.into()),
                roots: None,
            },
            ..Default::default()
        }
    }

    /// Effective project root
    pub fn project_root(&self) -> PathBuf {
        self.plugins
            .project_root
            .clone()
            .unwrap_or_else(annex_paths::project_root)
    }

    /// Effective plugin roots, highest priority first
    pub fn plugin_roots(&self) -> Vec<PathBuf> {
        let project_root = self.project_root();
        match &self.plugins.roots {
            Some(roots) => roots.iter().map(|root| project_root.join(root)).collect(),
            None => annex_paths::plugin_roots(&project_root),
        }
    }

    /// Effective built-in extensions directory
    pub fn builtin_dir(&self) -> PathBuf {
        let project_root = self.project_root();
        match &self.extensions.builtin_dir {
            Some(dir) => project_root.join(dir),
            None => annex_paths::builtin_extensions_dir(&project_root),
        }
    }
}
