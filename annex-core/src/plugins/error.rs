//! Extension host error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering, loading or resolving extensions
#[derive(Error, Debug)]
pub enum ExtensionHostError {
    /// No registered loader handles the file's extension
    #[error("No loader available for {path}")]
    NoLoader { path: PathBuf },

    /// Failed to load dynamic library or one of its symbols
    #[error("Failed to load unit library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// API version mismatch between annex and a unit
    #[error("API version mismatch in {path}: annex expects {expected}, unit has {found}")]
    ApiVersionMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    /// A unit with this file name is not compiled into the host
    #[error("Unit not registered: {path}")]
    UnitNotRegistered { path: PathBuf },

    /// The unit's export function panicked
    #[error("Unit panicked while listing its exports: {path}")]
    UnitPanicked { path: PathBuf },

    /// Invalid glob pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    /// A path could not be expressed relative to the project root
    #[error("{path} is not under project root {root}")]
    RelativePath { path: PathBuf, root: PathBuf },

    /// Malformed plugin manifest
    #[error("Invalid plugin manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
