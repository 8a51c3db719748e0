//! Extension point commands

use annex_core::{ExtensionHost, KIND_BACKEND};
use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::AnnexConfig;

/// Extension point arguments
#[derive(Args)]
pub struct ExtensionsArgs {
    #[command(subcommand)]
    pub command: ExtensionsCommands,
}

/// Extension point subcommands
#[derive(Subcommand)]
pub enum ExtensionsCommands {
    /// List the contributions of a point in run order
    Resolve {
        /// Extension point name
        point: String,
        /// Contribution kind
        #[arg(long, default_value = KIND_BACKEND)]
        kind: String,
    },
    /// Run a point's contributions and report the outcome
    Dispatch {
        /// Extension point name
        point: String,
        /// Contribution kind
        #[arg(long, default_value = KIND_BACKEND)]
        kind: String,
        /// Owner the dispatch context is scoped to
        #[arg(long, default_value = "cli")]
        owner: String,
        /// Execution cycle
        #[arg(long, default_value_t = 0)]
        cycle: u64,
    },
}

/// Run extensions command
pub async fn run(args: ExtensionsArgs, config: &AnnexConfig) -> Result<()> {
    let host = ExtensionHost::new(config.engine());

    match args.command {
        ExtensionsCommands::Resolve { point, kind } => resolve(&host, &point, &kind),
        ExtensionsCommands::Dispatch {
            point,
            kind,
            owner,
            cycle,
        } => dispatch(&host, &point, &kind, &owner, cycle).await,
    }
}

fn resolve(host: &ExtensionHost, point: &str, kind: &str) -> Result<()> {
    let contributions = host.resolve(point, kind);

    if contributions.is_empty() {
        println!("No contributions for {}/{}", kind, point);
        return Ok(());
    }

    for (index, contribution) in contributions.iter().enumerate() {
        println!(
            "{:>3}. {} [{}] {}",
            index + 1,
            contribution.name(),
            contribution.plugin().unwrap_or("builtin"),
            contribution.file().display()
        );
    }

    Ok(())
}

async fn dispatch(
    host: &ExtensionHost,
    point: &str,
    kind: &str,
    owner: &str,
    cycle: u64,
) -> Result<()> {
    let mut ctx = host.context(owner, cycle);
    let report = host.dispatch(point, kind, &mut ctx).await;

    let output = serde_json::json!({
        "report": &report,
        "notes": ctx.notes(),
        "extras_temporary": ctx.temporary_extras(),
        "extras_persistent": ctx.persistent_extras(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !report.is_clean() {
        tracing::warn!(
            point = %point,
            failures = report.failures.len(),
            "Some contributions failed"
        );
    }

    Ok(())
}
