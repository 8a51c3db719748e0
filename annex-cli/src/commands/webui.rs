//! Webui fragment lookup

use annex_core::{ExtensionHost, MARKUP_FILTERS, SCRIPT_FILTERS};
use anyhow::Result;
use clap::Args;

use crate::config::AnnexConfig;

/// Arguments for the webui command
#[derive(Debug, Args)]
pub struct WebuiArgs {
    /// Anchor (extension point) name
    pub point: String,

    /// Glob filter; repeat for several
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,

    /// Only script fragments (*.js, *.mjs)
    #[arg(long, conflicts_with_all = ["filters", "markup"])]
    pub scripts: bool,

    /// Only markup fragments (*.html, *.htm, *.xhtml)
    #[arg(long, conflicts_with = "filters")]
    pub markup: bool,
}

impl WebuiArgs {
    fn effective_filters(&self) -> Vec<String> {
        let preset: &[&str] = if self.scripts {
            SCRIPT_FILTERS
        } else if self.markup {
            MARKUP_FILTERS
        } else {
            return self.filters.clone();
        };
        preset.iter().map(|f| f.to_string()).collect()
    }
}

/// Print the resolved fragments as the lookup API would return them
pub fn run(args: WebuiArgs, config: &AnnexConfig) -> Result<()> {
    let host = ExtensionHost::new(config.engine());
    let extensions = host.webui_extensions(&args.point, &args.effective_filters());

    let output = serde_json::json!({ "extensions": extensions });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(filters: &[&str], scripts: bool, markup: bool) -> WebuiArgs {
        WebuiArgs {
            point: "sidebar-top".to_string(),
            filters: filters.iter().map(|f| f.to_string()).collect(),
            scripts,
            markup,
        }
    }

    #[test]
    fn test_presets_expand() {
        assert_eq!(args(&[], true, false).effective_filters(), vec!["*.js", "*.mjs"]);
        assert_eq!(
            args(&[], false, true).effective_filters(),
            vec!["*.html", "*.htm", "*.xhtml"]
        );
    }

    #[test]
    fn test_explicit_filters_kept() {
        assert_eq!(
            args(&["*.css"], false, false).effective_filters(),
            vec!["*.css"]
        );
        assert!(args(&[], false, false).effective_filters().is_empty());
    }
}
