//! Manifest parsing and validation errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors raised while parsing or validating a manifest.
///
/// All variants carry enough context (capability or module id plus path) to
/// locate the offending declaration; a load-time failure is fatal for the
/// whole module, never partially applied.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest document is not valid JSON or violates the schema.
    #[error("manifest schema error: {0}")]
    Schema(String),

    /// A guardrail field is outside its permitted bounds.
    #[error("capability '{capability}' guardrail out of bounds: {detail}")]
    GuardrailBounds {
        /// Capability whose guardrails failed validation.
        capability: String,
        /// Which field and why.
        detail: String,
    },

    /// Two capabilities in one manifest share an id.
    #[error("duplicate capability id '{0}'")]
    DuplicateCapabilityId(String),

    /// An exposed capability has no owner recorded.
    #[error("capability '{0}' requires metadata.owner when agent exposure is enabled")]
    MissingOwner(String),

    /// The resolved entrypoint does not exist on disk.
    #[error("capability '{capability}' entrypoint missing: {path}")]
    EntrypointNotFound {
        /// Capability whose entrypoint is absent.
        capability: String,
        /// The resolved path that was checked.
        path: PathBuf,
    },

    /// The resolved entrypoint is a directory.
    #[error("capability '{capability}' entrypoint is a directory: {path}")]
    EntrypointIsDirectory {
        /// Capability whose entrypoint resolved to a directory.
        capability: String,
        /// The resolved path.
        path: PathBuf,
    },

    /// The resolved entrypoint is a symlink. Symlinks are rejected so a
    /// post-load relink cannot move the target outside the jail.
    #[error("capability '{capability}' entrypoint must not be a symlink: {path}")]
    EntrypointIsSymlink {
        /// Capability whose entrypoint is a symlink.
        capability: String,
        /// The resolved path.
        path: PathBuf,
    },

    /// The resolved entrypoint escapes the module's repo root or is outside
    /// every allowed entrypoint root.
    #[error("capability '{capability}' entrypoint outside jail: {path} (jail: {jail})")]
    EntrypointOutsideJail {
        /// Capability whose entrypoint escapes.
        capability: String,
        /// The resolved path.
        path: PathBuf,
        /// The boundary that was violated.
        jail: PathBuf,
    },

    /// A redaction pattern failed to compile.
    #[error("capability '{capability}' redact pattern '{pattern}' invalid: {source}")]
    RedactPattern {
        /// Capability declaring the pattern.
        capability: String,
        /// The offending pattern.
        pattern: String,
        /// Compile error from the regex engine.
        source: regex::Error,
    },
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Schema(err.to_string())
    }
}
