//! Federation manifest model — the top-level document enumerating modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::entrypoint::normalize_lexically;

fn default_timeout_seconds() -> u64 {
    60
}

fn default_repo_root() -> String {
    ".".to_string()
}

fn default_include_in_root() -> bool {
    true
}

/// One liveness probe declared by a module. Probes are run by operator
/// tooling, never through the capability invocation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCommand {
    /// Human-readable probe label.
    pub label: String,
    /// Argv to execute.
    pub command: Vec<String>,
    /// Extra environment for the probe.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Probe-specific wall-clock ceiling, seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// A module's health block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleHealth {
    /// Declared liveness probes.
    pub commands: Vec<HealthCommand>,
}

/// One federation member: a capability manifest plus the filesystem jail
/// root for every capability it declares.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedModule {
    /// Module identifier, unique across the federation.
    pub id: String,
    /// One-line human description.
    pub summary: String,
    /// Capability manifest location, relative to the federation root.
    pub manifest: String,
    /// The module's jail root, relative to the federation root.
    #[serde(default = "default_repo_root")]
    pub repo_root: String,
    /// Free-form discovery tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the module participates in the default aggregate view.
    #[serde(default = "default_include_in_root")]
    pub include_in_root: bool,
    /// Liveness probes.
    #[serde(default)]
    pub health: ModuleHealth,
}

impl FederatedModule {
    /// Absolute capability manifest path for this module.
    #[must_use]
    pub fn manifest_path(&self, federation_root: &Path) -> PathBuf {
        normalize_lexically(&federation_root.join(&self.manifest))
    }

    /// Absolute jail root for this module.
    #[must_use]
    pub fn repo_path(&self, federation_root: &Path) -> PathBuf {
        normalize_lexically(&federation_root.join(&self.repo_root))
    }
}

/// The federation document: an ordered list of modules plus a version tag.
///
/// Pure data; existence checks and uniqueness enforcement live in the
/// loader, which is the trust boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationManifest {
    /// Manifest format version tag.
    pub version: String,
    /// Declared modules, in declaration order.
    pub modules: Vec<FederatedModule>,
}

impl FederationManifest {
    /// Parse a federation document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ManifestError::Schema`] for malformed documents.
    pub fn parse(bytes: &[u8]) -> crate::ManifestResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Modules participating in the default aggregate view, in declaration
    /// order.
    pub fn included_modules(&self) -> impl Iterator<Item = &FederatedModule> {
        self.modules.iter().filter(|module| module.include_in_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "version": "1",
        "modules": [
            {"id": "ops", "summary": "ops module", "manifest": "ops/manifest.json",
             "repoRoot": "ops",
             "health": {"commands": [{"label": "smoke", "command": ["true"]}]}},
            {"id": "docs", "summary": "docs module", "manifest": "docs/manifest.json",
             "includeInRoot": false}
        ]
    }"#;

    #[test]
    fn test_parse_and_paths() {
        let manifest = FederationManifest::parse(DOC.as_bytes()).unwrap();
        assert_eq!(manifest.modules.len(), 2);

        let root = Path::new("/srv/fed");
        let ops = &manifest.modules[0];
        assert_eq!(ops.manifest_path(root), PathBuf::from("/srv/fed/ops/manifest.json"));
        assert_eq!(ops.repo_path(root), PathBuf::from("/srv/fed/ops"));
        assert_eq!(ops.health.commands[0].timeout_seconds, 60);
    }

    #[test]
    fn test_default_repo_root_is_federation_root() {
        let manifest = FederationManifest::parse(DOC.as_bytes()).unwrap();
        let docs = &manifest.modules[1];
        assert_eq!(docs.repo_path(Path::new("/srv/fed")), PathBuf::from("/srv/fed"));
        assert!(!docs.include_in_root);
    }

    #[test]
    fn test_included_modules_filter() {
        let manifest = FederationManifest::parse(DOC.as_bytes()).unwrap();
        let ids: Vec<_> = manifest.included_modules().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["ops"]);
    }
}
