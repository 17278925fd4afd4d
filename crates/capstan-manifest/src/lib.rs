//! Capstan Manifest - typed capability and federation manifest models.
//!
//! This crate provides:
//! - [`Guardrails`]: per-capability runtime constraints (timeout, concurrency,
//!   environment allow-list, output ceilings, redaction)
//! - [`Capability`] / [`CapabilityManifest`]: a module's declared capabilities
//! - [`FederatedModule`] / [`FederationManifest`]: the top-level federation
//!   document enumerating modules
//! - Entrypoint resolution with jail checks (no symlinks, no escape from the
//!   module's repo root or its allowed entrypoint roots)
//!
//! Parsing and validation are pure aside from filesystem existence checks;
//! no file is ever opened for content beyond the manifest bytes themselves.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod capability;
mod entrypoint;
mod error;
mod federation;
mod guardrails;

pub use capability::{AgentConfig, Capability, CapabilityManifest, CapabilityMetadata, McpConfig};
pub use entrypoint::{WORKSPACE_ROOT_TOKEN, normalize_lexically};
pub use error::{ManifestError, ManifestResult};
pub use federation::{FederatedModule, FederationManifest, HealthCommand, ModuleHealth};
pub use guardrails::{
    DEFAULT_ALLOWED_ENV, DEFAULT_MAX_RUNTIME_SECONDS, DEFAULT_REDACT_REPLACEMENT,
    DEFAULT_STREAM_MAX_BYTES, Guardrails,
};
