//! Plugin metadata structures

use serde::{Deserialize, Serialize};

/// Optional `plugin.toml` found at the top of a plugin directory.
///
/// Every field is optional; a plugin without a manifest is identified and
/// named by its directory name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    /// Display name
    pub name: Option<String>,
    /// Plugin version (semver)
    pub version: Option<String>,
    /// Human-readable description
    pub description: String,
    /// Plugin author
    pub author: String,
}

impl PluginManifest {
    /// File name of the manifest inside a plugin directory
    pub const FILE_NAME: &'static str = "plugin.toml";
}
