//! Dynamic extension loader
//!
//! Turns files in a directory into [`Contribution`]s. Each file is a code
//! unit; the [`UnitLoader`] registered for its extension loads it and reads
//! the unit's export list. File names are the only ordering primitive, see
//! [`sort_key`].

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use annex_extension_api::{
    API_VERSION, Capability, Extension, ExtensionFactory, UnitExport, UnitGuard,
};
use globset::{GlobBuilder, GlobMatcher};
use libloading::Library;

use super::error::ExtensionHostError;

/// Ordering key of a unit file: its file name.
///
/// Units are run in lexicographic order of this key, which is why unit files
/// carry numeric prefixes such as `_10_`, `_50_`, `_90_`.
pub fn sort_key(path: &Path) -> OsString {
    path.file_name().map(OsString::from).unwrap_or_default()
}

/// A loaded code unit and everything it declared
pub struct LoadedUnit {
    path: PathBuf,
    exports: Vec<UnitExport>,
    library: Option<Arc<Library>>,
}

impl LoadedUnit {
    /// A unit whose code is already part of the process
    pub fn in_process(path: impl Into<PathBuf>, exports: Vec<UnitExport>) -> Self {
        Self {
            path: path.into(),
            exports,
            library: None,
        }
    }

    /// File the unit was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exports in declaration order
    pub fn exports(&self) -> &[UnitExport] {
        &self.exports
    }

    /// Pick the exports that implement `base`.
    ///
    /// Exports are walked last to first so a unit's own type wins over a base
    /// it re-exports near the top. With `one_per_file` the walk stops at the
    /// first match.
    pub fn select(&self, base: Capability, one_per_file: bool) -> Vec<Contribution> {
        let mut selected = Vec::new();

        for export in self.exports.iter().rev() {
            if !export.qualifies(base) {
                continue;
            }
            let Some(factory) = export.factory else {
                continue;
            };
            selected.push(Contribution {
                name: export.name.clone(),
                file: self.path.clone(),
                plugin: None,
                factory,
                library: self.library.clone(),
            });
            if one_per_file {
                break;
            }
        }

        selected
    }
}

impl fmt::Debug for LoadedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedUnit")
            .field("path", &self.path)
            .field("exports", &self.exports)
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

/// One contributed extension type, ready to instantiate
#[derive(Clone)]
pub struct Contribution {
    name: String,
    file: PathBuf,
    plugin: Option<String>,
    factory: ExtensionFactory,
    // Declared last: keeps the unit's code mapped while the factory is reachable
    library: Option<Arc<Library>>,
}

impl Contribution {
    /// Type name the unit exported
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit file this contribution came from
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Id of the contributing plugin, `None` for built-ins
    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub(crate) fn attributed_to(mut self, plugin: Option<&str>) -> Self {
        self.plugin = plugin.map(str::to_string);
        self
    }

    /// Build a fresh instance. The instance keeps the unit's code loaded.
    pub fn instantiate(&self) -> Instance {
        Instance {
            extension: (self.factory)(),
            library: self.library.clone(),
        }
    }
}

/// A live extension together with the library its code lives in
pub struct Instance {
    // Field order matters: the extension is dropped before the library
    extension: Box<dyn Extension>,
    library: Option<Arc<Library>>,
}

impl Instance {
    /// Guard keeping the unit loaded, `None` for in-process units
    pub fn unit_guard(&self) -> Option<UnitGuard> {
        self.library
            .as_ref()
            .map(|library| Arc::clone(library) as UnitGuard)
    }
}

impl Deref for Instance {
    type Target = dyn Extension;

    fn deref(&self) -> &Self::Target {
        self.extension.as_ref()
    }
}

impl DerefMut for Instance {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.extension.as_mut()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("dynamic", &self.library.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Contribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contribution")
            .field("name", &self.name)
            .field("file", &self.file)
            .field("plugin", &self.plugin)
            .finish()
    }
}

/// Loads one kind of code unit
pub trait UnitLoader: Send + Sync {
    /// File extensions (without the dot) this loader handles
    fn extensions(&self) -> &[String];

    /// Load the unit at `path` and read its exports
    fn load(&self, path: &Path) -> Result<LoadedUnit, ExtensionHostError>;
}

/// Loads units compiled as dynamic libraries with `export_unit!`
#[derive(Debug, Clone)]
pub struct LibraryUnitLoader {
    extensions: Vec<String>,
}

impl LibraryUnitLoader {
    /// Loader for the platform's library extension
    pub fn new() -> Self {
        Self {
            extensions: vec![std::env::consts::DLL_EXTENSION.to_string()],
        }
    }
}

impl Default for LibraryUnitLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitLoader for LibraryUnitLoader {
    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn load(&self, path: &Path) -> Result<LoadedUnit, ExtensionHostError> {
        // SAFETY: units live in plugin directories the operator installed.
        // They are expected to be built with export_unit! against this API.
        let library = unsafe { Library::new(path)? };

        let exports = {
            // SAFETY: symbol generated by export_unit! with this exact signature
            let api_version_fn: libloading::Symbol<extern "C" fn() -> u32> =
                unsafe { library.get(b"_annex_unit_api_version")? };
            let found = api_version_fn();
            if found != API_VERSION {
                return Err(ExtensionHostError::ApiVersionMismatch {
                    path: path.to_path_buf(),
                    expected: API_VERSION,
                    found,
                });
            }

            // SAFETY: symbol generated by export_unit! with this exact signature
            let exports_fn: libloading::Symbol<extern "C" fn() -> *mut Vec<UnitExport>> =
                unsafe { library.get(b"_annex_unit_exports")? };
            let raw = exports_fn();
            if raw.is_null() {
                return Err(ExtensionHostError::UnitPanicked {
                    path: path.to_path_buf(),
                });
            }
            // SAFETY: a non-null pointer comes from Box::into_raw in export_unit!
            // and ownership passes to us exactly once.
            unsafe { *Box::from_raw(raw) }
        };

        Ok(LoadedUnit {
            path: path.to_path_buf(),
            exports,
            library: Some(Arc::new(library)),
        })
    }
}

/// Units compiled into the host, looked up by file name.
///
/// The file still has to be present in the scanned directory; only its name
/// matters. Used for built-in extensions and in tests.
#[derive(Debug, Clone)]
pub struct StaticUnitLoader {
    extensions: Vec<String>,
    units: HashMap<OsString, Vec<UnitExport>>,
}

impl StaticUnitLoader {
    /// Loader for files ending in `.<extension>`
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extensions: vec![extension.into()],
            units: HashMap::new(),
        }
    }

    /// Builder: register the exports of the unit named `file_name`
    pub fn with_unit(mut self, file_name: impl Into<OsString>, exports: Vec<UnitExport>) -> Self {
        self.register(file_name, exports);
        self
    }

    /// Register the exports of the unit named `file_name`
    pub fn register(&mut self, file_name: impl Into<OsString>, exports: Vec<UnitExport>) {
        self.units.insert(file_name.into(), exports);
    }
}

impl UnitLoader for StaticUnitLoader {
    fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn load(&self, path: &Path) -> Result<LoadedUnit, ExtensionHostError> {
        let exports = path
            .file_name()
            .and_then(|name| self.units.get(name))
            .ok_or_else(|| ExtensionHostError::UnitNotRegistered {
                path: path.to_path_buf(),
            })?;
        Ok(LoadedUnit::in_process(path, exports.clone()))
    }
}

/// Loads contributions from unit files, picking a loader by file extension
#[derive(Clone, Default)]
pub struct ExtensionLoader {
    loaders: Vec<Arc<dyn UnitLoader>>,
}

impl ExtensionLoader {
    /// A loader with no unit loaders; nothing is loadable
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader for dynamic library units
    pub fn native() -> Self {
        Self::new().with_loader(Arc::new(LibraryUnitLoader::new()))
    }

    /// Builder: add a unit loader. Earlier loaders win on shared extensions.
    pub fn with_loader(mut self, loader: Arc<dyn UnitLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    fn loader_for(&self, path: &Path) -> Option<&dyn UnitLoader> {
        let ext = path.extension()?.to_str()?;
        self.loaders
            .iter()
            .find(|loader| loader.extensions().iter().any(|e| e == ext))
            .map(|loader| loader.as_ref())
    }

    /// Whether some unit loader handles this file
    pub fn is_loadable(&self, path: &Path) -> bool {
        self.loader_for(path).is_some()
    }

    /// Load a single unit file, surfacing any failure
    pub fn load_unit_file(&self, path: &Path) -> Result<LoadedUnit, ExtensionHostError> {
        let loader = self
            .loader_for(path)
            .ok_or_else(|| ExtensionHostError::NoLoader {
                path: path.to_path_buf(),
            })?;
        loader.load(path)
    }

    /// Load the contributions of every matching unit in `dir`.
    ///
    /// Files are taken when their name matches `name_pattern` (a glob) and a
    /// unit loader handles their extension, then ordered by [`sort_key`]. A
    /// unit that fails to load is logged and skipped. A missing directory
    /// yields nothing. Only an invalid pattern is an error.
    pub fn load_units(
        &self,
        dir: &Path,
        name_pattern: &str,
        base: Capability,
        one_per_file: bool,
    ) -> Result<Vec<Contribution>, ExtensionHostError> {
        let matcher = compile_pattern(name_pattern)?;
        let mut contributions = Vec::new();

        for path in self.unit_files(dir, &matcher) {
            match self.load_unit_file(&path) {
                Ok(unit) => {
                    let selected = unit.select(base, one_per_file);
                    if selected.is_empty() {
                        tracing::debug!(
                            file = %path.display(),
                            base = %base,
                            "Unit exports nothing implementing base"
                        );
                    }
                    contributions.extend(selected);
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "Failed to load unit");
                }
            }
        }

        Ok(contributions)
    }

    /// Load the contributions of a single unit file
    pub fn load_units_from_single_file(
        &self,
        path: &Path,
        base: Capability,
        one_per_file: bool,
    ) -> Result<Vec<Contribution>, ExtensionHostError> {
        Ok(self.load_unit_file(path)?.select(base, one_per_file))
    }

    fn unit_files(&self, dir: &Path, matcher: &GlobMatcher) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "No unit directory");
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| matcher.is_match(Path::new(name)))
            })
            .filter(|path| self.is_loadable(path))
            .collect();

        files.sort_by_key(|path| sort_key(path));
        files
    }
}

impl fmt::Debug for ExtensionLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions: Vec<&String> = self
            .loaders
            .iter()
            .flat_map(|loader| loader.extensions())
            .collect();
        f.debug_struct("ExtensionLoader")
            .field("extensions", &extensions)
            .finish()
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, ExtensionHostError> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}
