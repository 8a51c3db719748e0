use std::path::{Path, PathBuf};

use annex_core::{ExtensionsConfig, PluginsConfig};
use annex_extension_api::DeferredConfig;
use anyhow::{Context, Result};

use super::types::{
    AnnexConfig, DEFAULT_HOST, DEFAULT_PORT, RawAnnexConfig, RawDeferredConfig, RawServerConfig,
    ServerConfig,
};

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "ANNEX_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<AnnexConfig> {
        Self::load_from(&Self::user_config_path(), &Self::project_config_path())
    }

    /// Load configuration layering `project` over `user`; missing files are skipped
    pub fn load_from(user: &Path, project: &Path) -> Result<AnnexConfig> {
        let mut raw = RawAnnexConfig::default();

        // Layer 1: User config
        if let Some(user_config) = Self::read_raw(user)? {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project)? {
            raw = Self::merge_raw(raw, project_config);
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<Option<RawAnnexConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config layer");
        Ok(Some(raw))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        annex_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with ANNEX_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".annex/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawAnnexConfig, overlay: RawAnnexConfig) -> RawAnnexConfig {
        RawAnnexConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
                webui_dir: overlay.server.webui_dir.or(base.server.webui_dir),
            },
            plugins: PluginsConfig {
                project_root: overlay.plugins.project_root.or(base.plugins.project_root),
                roots: overlay.plugins.roots.or(base.plugins.roots),
            },
            extensions: ExtensionsConfig {
                builtin_dir: overlay.extensions.builtin_dir.or(base.extensions.builtin_dir),
            },
            deferred: RawDeferredConfig {
                delayed_mode: overlay.deferred.delayed_mode.or(base.deferred.delayed_mode),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawAnnexConfig) -> AnnexConfig {
        AnnexConfig {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
                webui_dir: raw.server.webui_dir,
            },
            plugins: raw.plugins,
            extensions: raw.extensions,
            deferred: DeferredConfig {
                delayed_mode: raw.deferred.delayed_mode.unwrap_or(false),
            },
        }
    }
}
