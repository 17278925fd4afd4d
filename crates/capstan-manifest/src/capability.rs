//! Capability manifest model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::entrypoint::resolve_entrypoint;
use crate::error::{ManifestError, ManifestResult};
use crate::guardrails::Guardrails;

/// Maintainer metadata attached to a capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapabilityMetadata {
    /// Primary maintainer or distribution list. Mandatory when the
    /// capability is exposed.
    pub owner: Option<String>,
    /// Free-form discovery tags.
    pub tags: Vec<String>,
    /// Taxonomy bucket for discovery UIs.
    pub category: Option<String>,
    /// Link or path to further documentation.
    pub docs: Option<String>,
}

/// MCP exposure toggle inside the agent block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Whether this capability is externally invocable.
    pub enabled: bool,
}

/// Agent-facing exposure configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// MCP exposure block; absent means not exposed.
    pub mcp: Option<McpConfig>,
}

/// One declared capability: an identified, guardrail-constrained executable
/// operation. Constructed once from manifest JSON and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Globally unique identifier, e.g. `deps.drift`.
    pub id: String,
    /// One-line human description.
    pub summary: String,
    /// Declared entrypoint path; may embed `${WORKSPACE_ROOT}`.
    pub entrypoint: String,
    /// Structural input schema (named properties, required subset,
    /// additional-properties policy).
    #[serde(default)]
    pub inputs: Value,
    /// Output schema; documentation only, never enforced.
    #[serde(default)]
    pub outputs: Value,
    /// Maintainer metadata.
    #[serde(default)]
    pub metadata: CapabilityMetadata,
    /// Exposure configuration.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Runtime constraints.
    #[serde(default)]
    pub guardrails: Guardrails,
}

impl Capability {
    /// Whether this capability is externally invocable.
    #[must_use]
    pub fn is_exposed(&self) -> bool {
        self.agent.mcp.as_ref().is_some_and(|mcp| mcp.enabled)
    }

    /// Resolve the declared entrypoint and verify it stays inside the jail.
    ///
    /// # Errors
    ///
    /// Returns an `Entrypoint*` variant of [`ManifestError`] when the path is
    /// missing, a directory, a symlink, or escapes the module's repo root or
    /// allowed entrypoint roots.
    pub fn resolve_entrypoint(
        &self,
        repo_root: &Path,
        manifest_dir: &Path,
    ) -> ManifestResult<PathBuf> {
        resolve_entrypoint(
            &self.id,
            &self.entrypoint,
            repo_root,
            manifest_dir,
            &self.guardrails,
        )
    }

    fn validate(&self) -> ManifestResult<()> {
        self.guardrails.validate(&self.id)?;
        if self.is_exposed() && self.metadata.owner.as_deref().is_none_or(str::is_empty) {
            return Err(ManifestError::MissingOwner(self.id.clone()));
        }
        Ok(())
    }
}

/// A module's capability manifest: a version tag plus its declared
/// capabilities, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityManifest {
    /// Manifest format version tag.
    pub version: String,
    /// Declared capabilities, in declaration order.
    pub capabilities: Vec<Capability>,
}

impl CapabilityManifest {
    /// Parse and structurally validate a capability manifest document.
    ///
    /// Validation covers required fields, guardrail bounds, duplicate
    /// capability ids within the manifest, and the owner-required-when-exposed
    /// rule. Entrypoint resolution is a separate, eager step at load time
    /// (see [`Capability::resolve_entrypoint`]) since it needs the module's
    /// filesystem layout.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Schema`] for malformed documents and the
    /// matching variant for each structural rule violated.
    pub fn parse(bytes: &[u8]) -> ManifestResult<Self> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for capability in &manifest.capabilities {
            if !seen.insert(&capability.id) {
                return Err(ManifestError::DuplicateCapabilityId(capability.id.clone()));
            }
            capability.validate()?;
        }
        Ok(manifest)
    }

    /// Capabilities with agent exposure enabled, in declaration order.
    pub fn enabled_capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter().filter(|cap| cap.is_exposed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_json(caps: &str) -> Vec<u8> {
        format!(r#"{{"version": "1", "capabilities": [{caps}]}}"#).into_bytes()
    }

    fn ping_cap(id: &str, extra: &str) -> String {
        format!(
            r#"{{"id": "{id}", "summary": "ping", "entrypoint": "scripts/ping.sh",
                 "metadata": {{"owner": "ops@example.com"}},
                 "agent": {{"mcp": {{"enabled": true}}}}{extra}}}"#
        )
    }

    #[test]
    fn test_parse_minimal() {
        let manifest = CapabilityManifest::parse(&manifest_json(&ping_cap("ops.ping", ""))).unwrap();
        assert_eq!(manifest.capabilities.len(), 1);
        assert!(manifest.capabilities[0].is_exposed());
    }

    #[test]
    fn test_missing_required_field() {
        let err = CapabilityManifest::parse(br#"{"version": "1"}"#).unwrap_err();
        assert!(matches!(err, ManifestError::Schema(_)));
    }

    #[test]
    fn test_duplicate_capability_id() {
        let caps = format!("{}, {}", ping_cap("ops.ping", ""), ping_cap("ops.ping", ""));
        let err = CapabilityManifest::parse(&manifest_json(&caps)).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateCapabilityId(id) if id == "ops.ping"));
    }

    #[test]
    fn test_exposed_requires_owner() {
        let cap = r#"{"id": "ops.ping", "summary": "ping", "entrypoint": "x.sh",
                      "agent": {"mcp": {"enabled": true}}}"#;
        let err = CapabilityManifest::parse(&manifest_json(cap)).unwrap_err();
        assert!(matches!(err, ManifestError::MissingOwner(_)));
    }

    #[test]
    fn test_empty_owner_rejected() {
        let cap = r#"{"id": "ops.ping", "summary": "ping", "entrypoint": "x.sh",
                      "metadata": {"owner": ""},
                      "agent": {"mcp": {"enabled": true}}}"#;
        assert!(CapabilityManifest::parse(&manifest_json(cap)).is_err());
    }

    #[test]
    fn test_unexposed_needs_no_owner() {
        let cap = r#"{"id": "ops.quiet", "summary": "quiet", "entrypoint": "x.sh"}"#;
        let manifest = CapabilityManifest::parse(&manifest_json(cap)).unwrap();
        assert!(!manifest.capabilities[0].is_exposed());
        assert_eq!(manifest.enabled_capabilities().count(), 0);
    }

    #[test]
    fn test_guardrail_bounds_fail_parse() {
        let cap = ping_cap("ops.ping", r#", "guardrails": {"maxRuntimeSeconds": 5}"#);
        let err = CapabilityManifest::parse(&manifest_json(&cap)).unwrap_err();
        assert!(matches!(err, ManifestError::GuardrailBounds { .. }));
    }

    #[test]
    fn test_enabled_order_is_declaration_order() {
        let caps = format!("{}, {}", ping_cap("b.cap", ""), ping_cap("a.cap", ""));
        let manifest = CapabilityManifest::parse(&manifest_json(&caps)).unwrap();
        let ids: Vec<_> = manifest.enabled_capabilities().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b.cap", "a.cap"]);
    }
}
