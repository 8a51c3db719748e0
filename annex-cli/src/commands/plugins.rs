//! Plugin inspection commands

use annex_core::{ExtensionHost, Plugin};
use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::config::AnnexConfig;

/// Plugin inspection arguments
#[derive(Args)]
pub struct PluginsArgs {
    #[command(subcommand)]
    pub command: PluginsCommands,
}

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginsCommands {
    /// List visible plugins in priority order
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show plugin details
    Info {
        /// Plugin id (its directory name)
        id: String,
    },
}

/// Run plugins command
pub fn run(args: PluginsArgs, config: &AnnexConfig) -> Result<()> {
    let host = ExtensionHost::new(config.engine());

    match args.command {
        PluginsCommands::List { json } => list_plugins(&host, json),
        PluginsCommands::Info { id } => show_plugin_info(&host, &id),
    }
}

fn list_plugins(host: &ExtensionHost, json: bool) -> Result<()> {
    let plugins = host.list_plugins();

    if json {
        println!("{}", serde_json::to_string_pretty(&plugins)?);
        return Ok(());
    }

    if plugins.is_empty() {
        println!("No plugins found");
        println!();
        println!("Plugin roots (highest priority first):");
        for root in host.registry().list_roots() {
            println!("  {}", root.display());
        }
        return Ok(());
    }

    println!("{}", plugin_table(&plugins));
    Ok(())
}

fn plugin_table(plugins: &[Plugin]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Version").fg(Color::Cyan),
        Cell::new("Root").fg(Color::Cyan),
    ]);

    for plugin in plugins {
        table.add_row(vec![
            Cell::new(&plugin.id),
            Cell::new(&plugin.name),
            Cell::new(plugin.manifest.version.as_deref().unwrap_or("-")),
            Cell::new(plugin.root.display()),
        ]);
    }

    table
}

fn show_plugin_info(host: &ExtensionHost, id: &str) -> Result<()> {
    let Some(plugin) = host.find_plugin(id) else {
        bail!("Plugin not found: {}", id);
    };

    println!("Plugin: {}", plugin.name);
    println!("  Id:          {}", plugin.id);
    println!("  Path:        {}", plugin.path.display());
    if let Some(version) = &plugin.manifest.version {
        println!("  Version:     {}", version);
    }
    if !plugin.manifest.description.is_empty() {
        println!("  Description: {}", plugin.manifest.description);
    }
    if !plugin.manifest.author.is_empty() {
        println!("  Author:      {}", plugin.manifest.author);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use annex_extension_api::PluginManifest;
    use std::path::PathBuf;

    #[test]
    fn test_plugin_table_lists_every_plugin() {
        let plugins = vec![
            Plugin {
                id: "memory".to_string(),
                name: "Memory".to_string(),
                path: PathBuf::from("/proj/plugins/memory"),
                root: PathBuf::from("/proj/plugins"),
                manifest: PluginManifest {
                    version: Some("0.3.0".to_string()),
                    ..Default::default()
                },
            },
            Plugin {
                id: "browser".to_string(),
                name: "browser".to_string(),
                path: PathBuf::from("/proj/usr/plugins/browser"),
                root: PathBuf::from("/proj/usr/plugins"),
                manifest: PluginManifest::default(),
            },
        ];

        let rendered = plugin_table(&plugins).to_string();
        assert!(rendered.contains("memory"));
        assert!(rendered.contains("0.3.0"));
        assert!(rendered.contains("browser"));
    }
}
