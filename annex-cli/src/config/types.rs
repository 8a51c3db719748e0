use std::path::PathBuf;

use annex_core::{EngineConfig, ExtensionsConfig, PluginsConfig};
use annex_extension_api::DeferredConfig;
use serde::{Deserialize, Serialize};

pub use annex_server::{DEFAULT_HOST, DEFAULT_PORT};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAnnexConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub extensions: ExtensionsConfig,

    #[serde(default)]
    pub deferred: RawDeferredConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    /// Host to bind to
    pub host: Option<String>,

    /// Port for the annex server
    pub port: Option<u16>,

    /// Directory holding the page template and UI files
    pub webui_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDeferredConfig {
    pub delayed_mode: Option<bool>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnnexConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub extensions: ExtensionsConfig,

    #[serde(default)]
    pub deferred: DeferredConfig,
}

impl AnnexConfig {
    /// The engine part of the configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            plugins: self.plugins.clone(),
            extensions: self.extensions.clone(),
            deferred: self.deferred.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port for the annex server
    pub port: u16,

    /// Directory holding the page template and UI files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webui_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            webui_dir: None,
        }
    }
}
