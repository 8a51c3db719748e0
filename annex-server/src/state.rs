//! Shared application state for the annex server

use std::path::PathBuf;
use std::sync::Arc;

use annex_core::ExtensionHost;
use chrono::{DateTime, Utc};

/// Shared application state accessible by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Extension engine answering webui lookups
    pub host: Arc<ExtensionHost>,
    /// Directory holding `index.html` and other UI files
    pub webui_dir: Option<PathBuf>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state around an extension host
    pub fn new(host: ExtensionHost) -> Self {
        Self {
            host: Arc::new(host),
            webui_dir: None,
            started_at: Utc::now(),
        }
    }

    /// Builder: serve UI files from `dir`
    pub fn with_webui_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.webui_dir = Some(dir.into());
        self
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
