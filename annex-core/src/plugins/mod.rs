//! Plugin discovery, unit loading and extension-point dispatch
//!
//! # Layout
//!
//! ```text
//! <root>/<plugin>/
//!   plugin.toml                      optional manifest
//!   extensions/<kind>/<point>/_10_x.so
//!   extensions/webui/<point>/x.html
//! ```
//!
//! Roots are searched highest priority first; the first root holding a
//! plugin id owns it.

pub mod dispatch;
pub mod error;
pub mod host;
pub mod loader;
pub mod registry;
pub mod webui;

pub use dispatch::{
    ContributionFailure, DispatchReport, EXTENSIONS_DIR, ExtensionDispatcher, KIND_BACKEND,
    KIND_WEBUI,
};
pub use error::ExtensionHostError;
pub use host::ExtensionHost;
pub use loader::{
    Contribution, ExtensionLoader, Instance, LibraryUnitLoader, LoadedUnit, StaticUnitLoader,
    UnitLoader, sort_key,
};
pub use registry::{Plugin, PluginRegistry};
pub use webui::{
    DEFAULT_FILTERS, MARKUP_FILTERS, SCRIPT_FILTERS, WebuiExtension, WebuiResolver,
};
