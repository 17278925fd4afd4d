//! Capstan Registry - federation loading and capability discovery.
//!
//! This crate provides:
//! - [`load_federation`] / [`load_single_manifest`]: the two load modes,
//!   both producing the same [`Registry`] shape
//! - [`Registry`]: the read-only-after-construction index mapping capability
//!   id to its owning module, resolved entrypoint, guardrails, and schema
//! - [`InputValidator`]: the per-capability runtime input validator
//!   synthesized from the declared input schema
//!
//! Loading is fail-closed: the first missing path, duplicate identifier, or
//! manifest violation aborts the whole load and no partial registry is ever
//! exposed.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod loader;
mod registry;
mod schema;

pub use error::{LoadError, LoadResult};
pub use loader::{load_federation, load_single_manifest};
pub use registry::{
    Bounds, CapabilityEntry, GuardrailSummary, LoadedModule, ModuleHealthView, ModuleSummary,
    Registry,
};
pub use schema::{InputError, InputValidator, sanitize_identifier};
