//! Annex serve command for running the HTTP server

use std::path::PathBuf;

use annex_core::ExtensionHost;
use annex_server::{AnnexServer, AppState, ServerConfig};
use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::config::AnnexConfig;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Directory holding index.html (overrides config)
    #[arg(long)]
    pub webui_dir: Option<PathBuf>,
}

/// Run the server in the foreground
pub async fn run(args: ServeArgs, config: &AnnexConfig) -> Result<()> {
    let server_config = ServerConfig::new(
        args.host.unwrap_or_else(|| config.server.host.clone()),
        args.port.unwrap_or(config.server.port),
    );

    let engine = config.engine();
    let project_root = engine.project_root();
    let mut state = AppState::new(ExtensionHost::new(engine));
    if let Some(dir) = args.webui_dir.or_else(|| config.server.webui_dir.clone()) {
        state = state.with_webui_dir(project_root.join(dir));
    }

    info!(
        "Starting annex server on {}:{}",
        server_config.host, server_config.port
    );
    AnnexServer::new(server_config, state).run().await?;
    Ok(())
}
