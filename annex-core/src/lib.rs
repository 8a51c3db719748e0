//! annex-core: the extension engine behind annex
//!
//! - **Plugin registry** - [`PluginRegistry`] merges plugin directories from
//!   priority-ordered roots
//! - **Loader** - [`ExtensionLoader`] turns unit files into [`Contribution`]s
//!   in file-name order
//! - **Dispatcher** - [`ExtensionDispatcher`] runs a point's contributions
//!   against one [`ExtensionContext`](annex_extension_api::ExtensionContext)
//! - **Webui resolver** - [`WebuiResolver`] lists UI fragments for an anchor
//!
//! [`ExtensionHost`] wires all of them from an [`EngineConfig`].
//!
//! # Quick Start
//!
//! ```no_run
//! use annex_core::{EngineConfig, ExtensionHost, KIND_BACKEND};
//!
//! # async fn example() {
//! let host = ExtensionHost::new(EngineConfig::for_project("/srv/agent"));
//! let mut ctx = host.context("agent-0", 0);
//! let report = host.dispatch("monologue_start", KIND_BACKEND, &mut ctx).await;
//! println!("ran {} contributions", report.invoked.len());
//! # }
//! ```

pub mod config;
pub mod plugins;

pub use config::{EngineConfig, ExtensionsConfig, PluginsConfig};
pub use plugins::{
    Contribution, ContributionFailure, DispatchReport, EXTENSIONS_DIR, ExtensionDispatcher,
    ExtensionHost,
    ExtensionHostError, ExtensionLoader, Instance, KIND_BACKEND, KIND_WEBUI, LibraryUnitLoader,
    LoadedUnit, MARKUP_FILTERS, Plugin, PluginRegistry, SCRIPT_FILTERS, StaticUnitLoader,
    UnitLoader, WebuiExtension, WebuiResolver, sort_key,
};
