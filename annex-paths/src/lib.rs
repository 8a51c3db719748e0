//! XDG Base Directory paths and project layout for annex.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths. Project-relative locations (plugin roots,
//! built-in extensions) hang off the project root.

use std::path::{Path, PathBuf};

/// Environment variable that overrides the project root.
pub const PROJECT_ROOT_ENV: &str = "ANNEX_PROJECT_ROOT";

/// Get the annex config directory.
///
/// Returns `$XDG_CONFIG_HOME/annex` if set, otherwise `~/.config/annex`.
///
/// # Examples
///
/// ```
/// use annex_paths::config_dir;
///
/// let config = config_dir();
/// let user_config = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("annex")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/annex")
    } else {
        PathBuf::from(".config/annex")
    }
}

/// Get the project root.
///
/// Returns `$ANNEX_PROJECT_ROOT` if set, otherwise the current directory.
/// Webui asset paths are reported relative to this directory.
pub fn project_root() -> PathBuf {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        PathBuf::from(root)
    } else {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }
}

/// Plugin roots for a project, highest priority first.
///
/// The user overlay (`usr/plugins`) shadows the bundled `plugins` directory.
pub fn plugin_roots(project_root: &Path) -> Vec<PathBuf> {
    vec![
        project_root.join("usr").join("plugins"),
        project_root.join("plugins"),
    ]
}

/// Directory holding the host's own built-in extensions.
pub fn builtin_extensions_dir(project_root: &Path) -> PathBuf {
    project_root.join("extensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_dir_ends_with_annex() {
        let path = config_dir();
        assert!(
            path.ends_with("annex"),
            "config_dir should end with 'annex'"
        );
    }

    #[test]
    #[serial]
    fn test_config_dir_respects_xdg_env() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/test-config");
        }
        let path = config_dir();
        assert_eq!(path, PathBuf::from("/tmp/test-config/annex"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    #[serial]
    fn test_project_root_respects_env() {
        unsafe {
            std::env::set_var(PROJECT_ROOT_ENV, "/srv/annex");
        }
        assert_eq!(project_root(), PathBuf::from("/srv/annex"));
        unsafe {
            std::env::remove_var(PROJECT_ROOT_ENV);
        }
    }

    #[test]
    fn test_plugin_roots_user_overlay_first() {
        let roots = plugin_roots(Path::new("/proj"));
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/proj/usr/plugins"),
                PathBuf::from("/proj/plugins")
            ]
        );
    }

    #[test]
    fn test_builtin_extensions_dir() {
        assert_eq!(
            builtin_extensions_dir(Path::new("/proj")),
            PathBuf::from("/proj/extensions")
        );
    }
}
