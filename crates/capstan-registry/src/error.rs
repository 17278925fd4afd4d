//! Load-time errors. Every variant is fatal: the registry either commits
//! fully or not at all.

use capstan_manifest::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised while loading a federation or a standalone manifest.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A declared module's manifest or repo root is absent on disk.
    #[error("module '{module}' {kind} missing: {path}")]
    ModuleMissing {
        /// The module whose path is absent.
        module: String,
        /// Which path kind was checked (`manifest` or `repo root`).
        kind: &'static str,
        /// The absent path.
        path: PathBuf,
    },

    /// Two federation entries share a module id.
    #[error("duplicate module id '{0}'")]
    DuplicateModuleId(String),

    /// A caller-supplied subset names a module the federation does not
    /// declare.
    #[error("unknown module id '{0}' in requested subset")]
    ModuleUnknown(String),

    /// Two modules declare a capability with the same id. Capability ids are
    /// unique across the entire federation, not just within a module.
    #[error("capability id '{capability}' declared by both '{first}' and '{second}'")]
    DuplicateCapability {
        /// The colliding capability id.
        capability: String,
        /// Module that declared it first.
        first: String,
        /// Module that declared it again.
        second: String,
    },

    /// A manifest failed to parse or validate.
    #[error("module '{module}': {source}")]
    Manifest {
        /// The module whose manifest failed.
        module: String,
        /// The underlying manifest error.
        source: ManifestError,
    },

    /// A manifest or federation document could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
