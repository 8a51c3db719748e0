use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "annex", about = "Plugin extension points for agent hosts")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (overrides config and ANNEX_PROJECT_ROOT)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Resolve and dispatch extension points
    Extensions(commands::extensions::ExtensionsArgs),
    /// Inspect plugins
    Plugins(commands::plugins::PluginsArgs),
    /// Run the annex server
    Serve(commands::serve::ServeArgs),
    /// Resolve webui fragments for an anchor
    Webui(commands::webui::WebuiArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::ConfigLoader::load()?;
    if let Some(project) = cli.project {
        config.plugins.project_root = Some(project);
    }

    match cli.command {
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::Extensions(args) => commands::extensions::run(args, &config).await,
        Commands::Plugins(args) => commands::plugins::run(args, &config),
        Commands::Serve(args) => commands::serve::run(args, &config).await,
        Commands::Webui(args) => commands::webui::run(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dispatch() {
        let cli = Cli::parse_from([
            "annex",
            "--project",
            "/srv/agent",
            "extensions",
            "dispatch",
            "monologue_start",
            "--cycle",
            "3",
        ]);
        assert_eq!(cli.project, Some(PathBuf::from("/srv/agent")));
        let Commands::Extensions(args) = cli.command else {
            panic!("expected extensions command");
        };
        let commands::extensions::ExtensionsCommands::Dispatch {
            point, kind, cycle, ..
        } = args.command
        else {
            panic!("expected dispatch");
        };
        assert_eq!(point, "monologue_start");
        assert_eq!(kind, "backend");
        assert_eq!(cycle, 3);
    }

    #[test]
    fn test_parse_webui_filters() {
        let cli = Cli::parse_from(["annex", "webui", "sidebar-top", "-f", "*.html", "-f", "*.js"]);
        let Commands::Webui(args) = cli.command else {
            panic!("expected webui command");
        };
        assert_eq!(args.filters, vec!["*.html", "*.js"]);
    }
}
