//! The read-only capability registry and its discovery views.

use capstan_manifest::{Capability, FederatedModule, HealthCommand};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::{LoadError, LoadResult};

/// One capability paired with its eagerly resolved entrypoint.
#[derive(Debug, Clone)]
pub struct CapabilityEntry {
    /// The declared capability contract.
    pub capability: Capability,
    /// Resolved, jail-checked entrypoint path.
    pub entrypoint: PathBuf,
}

/// One loaded federation member: the module descriptor plus every
/// capability it declares, entrypoints already resolved.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    /// The federation entry describing this module.
    pub descriptor: FederatedModule,
    /// Absolute path of the module's capability manifest.
    pub manifest_path: PathBuf,
    /// Absolute jail root for this module's entrypoints.
    pub repo_root: PathBuf,
    /// Declared capabilities in declaration order.
    pub entries: Vec<CapabilityEntry>,
}

/// Summary row in the module index view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    /// Module id.
    pub id: String,
    /// Module summary line.
    pub summary: String,
    /// Absolute manifest path.
    pub manifest_path: PathBuf,
    /// Total declared capabilities.
    pub capability_total: usize,
    /// Capabilities with agent exposure enabled.
    pub capability_enabled: usize,
    /// Module discovery tags.
    pub tags: Vec<String>,
}

/// Min/max aggregate of one numeric guardrail field across a module.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Bounds {
    /// Smallest declared value.
    pub min: u64,
    /// Largest declared value.
    pub max: u64,
}

impl Bounds {
    fn fold(values: impl Iterator<Item = u64>) -> Option<Self> {
        values.fold(None, |acc: Option<Self>, v| {
            Some(match acc {
                None => Self { min: v, max: v },
                Some(b) => Self {
                    min: b.min.min(v),
                    max: b.max.max(v),
                },
            })
        })
    }
}

/// Aggregate of guardrail fields across a module's enabled capabilities:
/// min/max per numeric field, union per set field. Answers "what is the most
/// permissive guardrail in this module" for auditing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailSummary {
    /// Min/max of `maxRuntimeSeconds`.
    pub max_runtime_seconds: Bounds,
    /// Min/max of `maxConcurrency`.
    pub max_concurrency: Bounds,
    /// Min/max of `stdoutMaxBytes`.
    pub stdout_max_bytes: Bounds,
    /// Min/max of `stderrMaxBytes`.
    pub stderr_max_bytes: Bounds,
    /// Union of `allowedExitCodes`.
    pub allowed_exit_codes: BTreeSet<i32>,
    /// Union of `allowedEnv`.
    pub allowed_env: BTreeSet<String>,
    /// Union of `allowedEntrypointRoots`.
    pub allowed_entrypoint_roots: BTreeSet<String>,
    /// Whether any enabled capability declares network access.
    pub allow_network: bool,
}

/// Health view row: the module's guardrail aggregate plus its declared
/// liveness probes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleHealthView {
    /// Module id.
    pub id: String,
    /// Guardrail aggregate over enabled capabilities; absent when the module
    /// exposes none.
    pub guardrail_summary: Option<GuardrailSummary>,
    /// Declared liveness probes.
    pub health_commands: Vec<HealthCommand>,
}

/// In-memory, read-only-after-construction capability index.
///
/// Construction enforces federation-wide capability id uniqueness; after
/// that the registry is safe for unsynchronized concurrent reads. Iteration
/// order is manifest declaration order, so discovery listings are stable
/// across runs.
#[derive(Debug)]
pub struct Registry {
    modules: Vec<LoadedModule>,
    // capability id -> (module index, entry index)
    index: BTreeMap<String, (usize, usize)>,
}

impl Registry {
    /// Build a registry over loaded modules.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::DuplicateCapability`] when two modules declare
    /// the same capability id; the load is not committed.
    pub fn new(modules: Vec<LoadedModule>) -> LoadResult<Self> {
        let mut index = BTreeMap::new();
        for (module_idx, module) in modules.iter().enumerate() {
            for (entry_idx, entry) in module.entries.iter().enumerate() {
                if let Some(&(prev, _)) =
                    index.get(&entry.capability.id)
                {
                    let first: &LoadedModule = &modules[prev];
                    return Err(LoadError::DuplicateCapability {
                        capability: entry.capability.id.clone(),
                        first: first.descriptor.id.clone(),
                        second: module.descriptor.id.clone(),
                    });
                }
                index.insert(entry.capability.id.clone(), (module_idx, entry_idx));
            }
        }
        Ok(Self { modules, index })
    }

    /// All loaded modules, in federation declaration order.
    #[must_use]
    pub fn modules(&self) -> &[LoadedModule] {
        &self.modules
    }

    /// Look up a capability by id.
    #[must_use]
    pub fn find(&self, capability_id: &str) -> Option<(&LoadedModule, &CapabilityEntry)> {
        let &(module_idx, entry_idx) = self.index.get(capability_id)?;
        let module = &self.modules[module_idx];
        Some((module, &module.entries[entry_idx]))
    }

    /// Capabilities with agent exposure enabled, in declaration order.
    pub fn enabled_capabilities(
        &self,
    ) -> impl Iterator<Item = (&LoadedModule, &CapabilityEntry)> {
        self.modules.iter().flat_map(|module| {
            module
                .entries
                .iter()
                .filter(|entry| entry.capability.is_exposed())
                .map(move |entry| (module, entry))
        })
    }

    /// Summary view for discovery UIs. Purely derived, no I/O.
    #[must_use]
    pub fn module_index(&self) -> Vec<ModuleSummary> {
        self.modules
            .iter()
            .map(|module| ModuleSummary {
                id: module.descriptor.id.clone(),
                summary: module.descriptor.summary.clone(),
                manifest_path: module.manifest_path.clone(),
                capability_total: module.entries.len(),
                capability_enabled: module
                    .entries
                    .iter()
                    .filter(|e| e.capability.is_exposed())
                    .count(),
                tags: module.descriptor.tags.clone(),
            })
            .collect()
    }

    /// Per-module guardrail aggregates plus health commands.
    #[must_use]
    pub fn health_snapshot(&self) -> Vec<ModuleHealthView> {
        self.modules
            .iter()
            .map(|module| ModuleHealthView {
                id: module.descriptor.id.clone(),
                guardrail_summary: summarize_guardrails(module),
                health_commands: module.descriptor.health.commands.clone(),
            })
            .collect()
    }
}

fn summarize_guardrails(module: &LoadedModule) -> Option<GuardrailSummary> {
    let enabled: Vec<_> = module
        .entries
        .iter()
        .filter(|e| e.capability.is_exposed())
        .map(|e| &e.capability.guardrails)
        .collect();
    if enabled.is_empty() {
        return None;
    }

    Some(GuardrailSummary {
        max_runtime_seconds: Bounds::fold(enabled.iter().map(|g| g.max_runtime_seconds))?,
        max_concurrency: Bounds::fold(enabled.iter().map(|g| g.max_concurrency as u64))?,
        stdout_max_bytes: Bounds::fold(enabled.iter().map(|g| g.stdout_max_bytes as u64))?,
        stderr_max_bytes: Bounds::fold(enabled.iter().map(|g| g.stderr_max_bytes as u64))?,
        allowed_exit_codes: enabled
            .iter()
            .flat_map(|g| g.allowed_exit_codes.iter().copied())
            .collect(),
        allowed_env: enabled
            .iter()
            .flat_map(|g| g.allowed_env.iter().cloned())
            .collect(),
        allowed_entrypoint_roots: enabled
            .iter()
            .flat_map(|g| g.allowed_entrypoint_roots.iter().cloned())
            .collect(),
        allow_network: enabled.iter().any(|g| g.allow_network),
    })
}
