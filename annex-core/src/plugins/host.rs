//! ExtensionHost - the engine facade the server and CLI talk to

use std::sync::Arc;

use annex_extension_api::{
    DeferredTasks, ExtensionContext, TokioSpawner, is_delayed_mode_enabled,
};

use super::dispatch::{DispatchReport, ExtensionDispatcher};
use super::loader::{Contribution, ExtensionLoader};
use super::registry::{Plugin, PluginRegistry};
use super::webui::{WebuiExtension, WebuiResolver};
use crate::config::EngineConfig;

/// Wires registry, loader, dispatcher and webui resolver from one config.
///
/// Deferred work started through contexts handed out by [`context`](Self::context)
/// lives in a store shared by the whole host, scoped by owner. It runs on the
/// Tokio runtime the host was created in, or the one current when the work
/// starts.
#[derive(Debug, Clone)]
pub struct ExtensionHost {
    config: EngineConfig,
    registry: PluginRegistry,
    dispatcher: ExtensionDispatcher,
    webui: WebuiResolver,
    deferred: Arc<DeferredTasks>,
}

impl ExtensionHost {
    /// Host loading dynamic library units
    pub fn new(config: EngineConfig) -> Self {
        Self::with_loader(config, ExtensionLoader::native())
    }

    /// Host using a custom unit loader
    pub fn with_loader(config: EngineConfig, loader: ExtensionLoader) -> Self {
        let registry = PluginRegistry::new(config.plugin_roots());
        let dispatcher =
            ExtensionDispatcher::new(registry.clone(), loader, Some(config.builtin_dir()));
        let webui = WebuiResolver::new(registry.clone(), config.project_root());

        for root in registry.list_roots() {
            if root.is_dir() && !webui.serves_root(root) {
                tracing::warn!(
                    root = %root.display(),
                    "Plugin root is outside the project root; its webui fragments are not served"
                );
            }
        }

        tracing::debug!(
            roots = ?registry.list_roots(),
            builtin = %config.builtin_dir().display(),
            "Extension host ready"
        );

        Self {
            config,
            registry,
            dispatcher,
            webui,
            deferred: Arc::new(DeferredTasks::with_spawner(Arc::new(TokioSpawner::current()))),
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plugin registry
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Deferred task store shared by this host's contexts
    pub fn deferred(&self) -> &Arc<DeferredTasks> {
        &self.deferred
    }

    /// All visible plugins
    pub fn list_plugins(&self) -> Vec<Plugin> {
        self.registry.list_plugins()
    }

    /// A plugin by id
    pub fn find_plugin(&self, id: &str) -> Option<Plugin> {
        self.registry.find_plugin(id)
    }

    /// A dispatch context for `owner` at `cycle`, sharing this host's
    /// deferred store and delayed-mode setting
    pub fn context(&self, owner: &str, cycle: u64) -> ExtensionContext {
        ExtensionContext::new(owner)
            .with_cycle(cycle)
            .with_delayed_mode(is_delayed_mode_enabled(&self.config.deferred))
            .with_deferred(Arc::clone(&self.deferred))
    }

    /// Contributions for a point, in run order
    pub fn resolve(&self, point: &str, kind: &str) -> Vec<Contribution> {
        self.dispatcher.resolve(point, kind)
    }

    /// Run a point's contributions against `ctx`
    pub async fn dispatch(
        &self,
        point: &str,
        kind: &str,
        ctx: &mut ExtensionContext,
    ) -> DispatchReport {
        self.dispatcher.dispatch(point, kind, ctx).await
    }

    /// Webui fragments for an anchor
    pub fn webui_extensions<S: AsRef<str>>(
        &self,
        point: &str,
        filters: &[S],
    ) -> Vec<WebuiExtension> {
        self.webui.resolve(point, filters)
    }
}
