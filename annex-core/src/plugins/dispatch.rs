//! Extension-point dispatcher
//!
//! Collects the contributions for a point from every plugin, then from the
//! host's built-in directory, and runs them one after another against a
//! single context.

use std::panic::AssertUnwindSafe;
use std::path::{Component, Path, PathBuf};

use annex_extension_api::{Capability, ExtensionContext};
use futures::FutureExt;
use serde::Serialize;

use super::loader::{Contribution, ExtensionLoader};
use super::registry::PluginRegistry;

/// Kind for code contributions run at lifecycle hooks
pub const KIND_BACKEND: &str = "backend";

/// Kind for UI fragment contributions
pub const KIND_WEBUI: &str = "webui";

/// Directory inside a plugin holding `<kind>/<point>/` trees
pub const EXTENSIONS_DIR: &str = "extensions";

/// Whether `name` is usable as a single path segment.
///
/// Point and kind names are joined onto plugin paths, so anything that would
/// climb out of or skip across directories resolves to nothing.
pub fn is_valid_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// A contribution that failed during dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributionFailure {
    /// Exported type name
    pub name: String,
    /// Unit file
    pub file: PathBuf,
    /// Contributing plugin, `None` for built-ins
    pub plugin: Option<String>,
    /// What went wrong
    pub error: String,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Point that was dispatched
    pub point: String,
    /// Contribution names in the order they ran
    pub invoked: Vec<String>,
    /// Contributions that returned an error or panicked
    pub failures: Vec<ContributionFailure>,
}

impl DispatchReport {
    /// True when every contribution succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves and runs the contributions of extension points
#[derive(Debug, Clone)]
pub struct ExtensionDispatcher {
    registry: PluginRegistry,
    loader: ExtensionLoader,
    builtin_dir: Option<PathBuf>,
}

impl ExtensionDispatcher {
    /// Create a dispatcher. `builtin_dir` holds the host's own
    /// `<kind>/<point>/` tree, searched after every plugin.
    pub fn new(
        registry: PluginRegistry,
        loader: ExtensionLoader,
        builtin_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            registry,
            loader,
            builtin_dir,
        }
    }

    /// Plugin registry used for lookups
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Directories searched for `point`, in dispatch order, with the owning
    /// plugin id (`None` for the built-in directory)
    pub fn point_dirs(&self, point: &str, kind: &str) -> Vec<(Option<String>, PathBuf)> {
        if !is_valid_segment(point) || !is_valid_segment(kind) {
            tracing::debug!(point = %point, kind = %kind, "Not a valid extension point");
            return Vec::new();
        }

        let mut dirs: Vec<(Option<String>, PathBuf)> = self
            .registry
            .resolve_subpath_with_plugins(&[EXTENSIONS_DIR, kind, point])
            .into_iter()
            .map(|(plugin, path)| (Some(plugin.id), path))
            .collect();

        if let Some(builtin) = &self.builtin_dir {
            let path = builtin.join(kind).join(point);
            if path.is_dir() {
                dirs.push((None, path));
            }
        }

        dirs
    }

    /// Contributions for `point`, in the order they run.
    ///
    /// Directory by directory (registry order, then built-ins), and by file
    /// name within a directory.
    pub fn resolve(&self, point: &str, kind: &str) -> Vec<Contribution> {
        let mut contributions = Vec::new();

        for (plugin, dir) in self.point_dirs(point, kind) {
            match self
                .loader
                .load_units(&dir, "*", Capability::EXTENSION, true)
            {
                Ok(loaded) => contributions.extend(
                    loaded
                        .into_iter()
                        .map(|c| c.attributed_to(plugin.as_deref())),
                ),
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "Failed to scan extension directory");
                }
            }
        }

        contributions
    }

    /// Run every contribution for `point` against `ctx`.
    ///
    /// Each contribution gets a fresh instance. An error or panic is logged
    /// and recorded in the report; the remaining contributions still run.
    pub async fn dispatch(
        &self,
        point: &str,
        kind: &str,
        ctx: &mut ExtensionContext,
    ) -> DispatchReport {
        ctx.set_point(point);
        let mut report = DispatchReport {
            point: point.to_string(),
            ..Default::default()
        };

        for contribution in self.resolve(point, kind) {
            let plugin = contribution.plugin().unwrap_or("builtin");
            report.invoked.push(contribution.name().to_string());

            let Ok(mut instance) =
                std::panic::catch_unwind(AssertUnwindSafe(|| contribution.instantiate()))
            else {
                tracing::error!(
                    point = %point,
                    plugin = %plugin,
                    file = %contribution.file().display(),
                    "Extension panicked during construction"
                );
                report.failures.push(failure(&contribution, "panicked during construction"));
                continue;
            };

            ctx.set_unit_guard(instance.unit_guard());
            let outcome = AssertUnwindSafe(instance.execute(ctx)).catch_unwind().await;
            ctx.set_unit_guard(None);

            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(
                        point = %point,
                        plugin = %plugin,
                        extension = %contribution.name(),
                        "Extension executed"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        point = %point,
                        plugin = %plugin,
                        file = %contribution.file().display(),
                        error = %e,
                        "Extension failed"
                    );
                    report.failures.push(failure(&contribution, &e.to_string()));
                }
                Err(_) => {
                    tracing::error!(
                        point = %point,
                        plugin = %plugin,
                        file = %contribution.file().display(),
                        "Extension panicked"
                    );
                    report.failures.push(failure(&contribution, "panicked"));
                }
            }
        }

        report
    }
}

fn failure(contribution: &Contribution, error: &str) -> ContributionFailure {
    ContributionFailure {
        name: contribution.name().to_string(),
        file: contribution.file().to_path_buf(),
        plugin: contribution.plugin().map(str::to_string),
        error: error.to_string(),
    }
}
