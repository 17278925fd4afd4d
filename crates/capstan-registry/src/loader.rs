//! Federation and single-manifest load modes.
//!
//! Both modes produce the same [`Registry`] shape so downstream consumers
//! are mode-agnostic. Validation is fail-fast: the first failure halts the
//! load with enough context to locate the offending module or capability.

use capstan_manifest::{
    CapabilityManifest, FederatedModule, FederationManifest, ModuleHealth,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{LoadError, LoadResult};
use crate::registry::{CapabilityEntry, LoadedModule, Registry};

fn read_bytes(path: &Path) -> LoadResult<Vec<u8>> {
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_module(
    descriptor: FederatedModule,
    manifest_path: PathBuf,
    repo_root: PathBuf,
) -> LoadResult<LoadedModule> {
    if !manifest_path.exists() {
        return Err(LoadError::ModuleMissing {
            module: descriptor.id,
            kind: "manifest",
            path: manifest_path,
        });
    }
    if !repo_root.is_dir() {
        return Err(LoadError::ModuleMissing {
            module: descriptor.id,
            kind: "repo root",
            path: repo_root,
        });
    }

    let bytes = read_bytes(&manifest_path)?;
    let manifest = CapabilityManifest::parse(&bytes).map_err(|source| LoadError::Manifest {
        module: descriptor.id.clone(),
        source,
    })?;

    // Entrypoints are resolved eagerly so a broken capability fails the whole
    // module load rather than failing silently at call time.
    let manifest_dir = manifest_path
        .parent()
        .map_or_else(|| repo_root.clone(), Path::to_path_buf);
    let mut entries = Vec::with_capacity(manifest.capabilities.len());
    for capability in manifest.capabilities {
        let entrypoint = capability
            .resolve_entrypoint(&repo_root, &manifest_dir)
            .map_err(|source| LoadError::Manifest {
                module: descriptor.id.clone(),
                source,
            })?;
        debug!(
            capability = %capability.id,
            entrypoint = %entrypoint.display(),
            "resolved entrypoint"
        );
        entries.push(CapabilityEntry {
            capability,
            entrypoint,
        });
    }

    Ok(LoadedModule {
        descriptor,
        manifest_path,
        repo_root,
        entries,
    })
}

/// Load a federation document and every module it declares (or a
/// caller-supplied subset by id).
///
/// # Errors
///
/// Returns the first [`LoadError`] encountered: unreadable or malformed
/// documents, missing module paths, duplicate module or capability ids, or
/// an unknown id in the requested subset.
pub fn load_federation(
    federation_path: &Path,
    federation_root: &Path,
    subset: Option<&[String]>,
) -> LoadResult<Registry> {
    let bytes = read_bytes(federation_path)?;
    let federation = FederationManifest::parse(&bytes).map_err(|source| LoadError::Manifest {
        module: "federation".to_string(),
        source,
    })?;

    if let Some(wanted) = subset {
        let declared: BTreeSet<&str> = federation.modules.iter().map(|m| m.id.as_str()).collect();
        for id in wanted {
            if !declared.contains(id.as_str()) {
                return Err(LoadError::ModuleUnknown(id.clone()));
            }
        }
    }

    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut modules = Vec::new();
    for descriptor in federation.modules {
        if !seen.insert(descriptor.id.clone()) {
            return Err(LoadError::DuplicateModuleId(descriptor.id));
        }
        if subset.is_some_and(|wanted| !wanted.iter().any(|id| id == &descriptor.id)) {
            continue;
        }
        let manifest_path = descriptor.manifest_path(federation_root);
        let repo_root = descriptor.repo_path(federation_root);
        modules.push(load_module(descriptor, manifest_path, repo_root)?);
    }

    let registry = Registry::new(modules)?;
    info!(
        modules = registry.modules().len(),
        capabilities = registry.enabled_capabilities().count(),
        "federation loaded"
    );
    Ok(registry)
}

/// Load exactly one capability manifest standalone, synthesizing a
/// single-module federation around it. Useful for isolated testing.
///
/// The synthesized module id defaults to the manifest's parent directory
/// name (`standalone` when that is unavailable).
///
/// # Errors
///
/// Returns a [`LoadError`] on unreadable or invalid manifests.
pub fn load_single_manifest(
    manifest_path: &Path,
    repo_root: &Path,
    module_id: Option<&str>,
) -> LoadResult<Registry> {
    let id = module_id.map_or_else(
        || {
            manifest_path
                .parent()
                .and_then(Path::file_name)
                .map_or_else(|| "standalone".to_string(), |n| n.to_string_lossy().into_owned())
        },
        ToString::to_string,
    );

    let descriptor = FederatedModule {
        id,
        summary: format!("standalone manifest {}", manifest_path.display()),
        manifest: manifest_path.display().to_string(),
        repo_root: repo_root.display().to_string(),
        tags: Vec::new(),
        include_in_root: true,
        health: ModuleHealth::default(),
    };

    let module = load_module(
        descriptor,
        manifest_path.to_path_buf(),
        repo_root.to_path_buf(),
    )?;
    Registry::new(vec![module])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, caps: &str) -> PathBuf {
        let path = dir.join("manifest.json");
        fs::write(
            &path,
            format!(r#"{{"version": "1", "capabilities": [{caps}]}}"#),
        )
        .unwrap();
        path
    }

    fn write_script(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "#!/bin/sh\necho pong\n").unwrap();
    }

    fn ping_cap(id: &str) -> String {
        format!(
            r#"{{"id": "{id}", "summary": "ping", "entrypoint": "scripts/ping.sh",
                 "metadata": {{"owner": "ops"}},
                 "agent": {{"mcp": {{"enabled": true}}}}}}"#
        )
    }

    fn federation_doc(root: &Path, modules: &str) -> PathBuf {
        let path = root.join("federation.json");
        fs::write(&path, format!(r#"{{"version": "1", "modules": [{modules}]}}"#)).unwrap();
        path
    }

    fn setup_module(root: &Path, name: &str, cap_id: &str) -> String {
        let module_dir = root.join(name);
        fs::create_dir_all(&module_dir).unwrap();
        write_script(&module_dir, "scripts/ping.sh");
        write_manifest(&module_dir, &ping_cap(cap_id));
        format!(
            r#"{{"id": "{name}", "summary": "{name}", "manifest": "{name}/manifest.json", "repoRoot": "{name}"}}"#
        )
    }

    #[test]
    fn test_load_federation() {
        let root = TempDir::new().unwrap();
        let ops = setup_module(root.path(), "ops", "ops.ping");
        let docs = setup_module(root.path(), "docs", "docs.ping");
        let fed = federation_doc(root.path(), &format!("{ops}, {docs}"));

        let registry = load_federation(&fed, root.path(), None).unwrap();
        assert_eq!(registry.modules().len(), 2);
        assert!(registry.find("ops.ping").is_some());
        assert!(registry.find("docs.ping").is_some());
    }

    #[test]
    fn test_subset_load() {
        let root = TempDir::new().unwrap();
        let ops = setup_module(root.path(), "ops", "ops.ping");
        let docs = setup_module(root.path(), "docs", "docs.ping");
        let fed = federation_doc(root.path(), &format!("{ops}, {docs}"));

        let registry =
            load_federation(&fed, root.path(), Some(&["docs".to_string()])).unwrap();
        assert_eq!(registry.modules().len(), 1);
        assert!(registry.find("ops.ping").is_none());
    }

    #[test]
    fn test_subset_unknown_module() {
        let root = TempDir::new().unwrap();
        let ops = setup_module(root.path(), "ops", "ops.ping");
        let fed = federation_doc(root.path(), &ops);

        let err =
            load_federation(&fed, root.path(), Some(&["ghost".to_string()])).unwrap_err();
        assert!(matches!(err, LoadError::ModuleUnknown(id) if id == "ghost"));
    }

    #[test]
    fn test_missing_manifest_path() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("ops")).unwrap();
        let fed = federation_doc(
            root.path(),
            r#"{"id": "ops", "summary": "ops", "manifest": "ops/manifest.json", "repoRoot": "ops"}"#,
        );
        let err = load_federation(&fed, root.path(), None).unwrap_err();
        assert!(matches!(err, LoadError::ModuleMissing { kind: "manifest", .. }));
    }

    #[test]
    fn test_duplicate_module_id() {
        let root = TempDir::new().unwrap();
        let ops = setup_module(root.path(), "ops", "ops.ping");
        let fed = federation_doc(root.path(), &format!("{ops}, {ops}"));
        let err = load_federation(&fed, root.path(), None).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateModuleId(id) if id == "ops"));
    }

    #[test]
    fn test_duplicate_capability_across_modules() {
        let root = TempDir::new().unwrap();
        let a = setup_module(root.path(), "a", "shared.cap");
        let b = setup_module(root.path(), "b", "shared.cap");
        let fed = federation_doc(root.path(), &format!("{a}, {b}"));
        let err = load_federation(&fed, root.path(), None).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateCapability { .. }));
    }

    #[test]
    fn test_jail_escape_fails_load() {
        let root = TempDir::new().unwrap();
        let module_dir = root.path().join("ops");
        fs::create_dir_all(module_dir.join("mcp")).unwrap();
        // A real file outside the module's repo root.
        write_script(root.path(), "etc/passwd");
        fs::write(
            module_dir.join("mcp/manifest.json"),
            r#"{"version": "1", "capabilities": [
                {"id": "ops.evil", "summary": "evil", "entrypoint": "../../etc/passwd",
                 "metadata": {"owner": "ops"},
                 "agent": {"mcp": {"enabled": true}}}]}"#,
        )
        .unwrap();
        let fed = federation_doc(
            root.path(),
            r#"{"id": "ops", "summary": "ops", "manifest": "ops/mcp/manifest.json", "repoRoot": "ops"}"#,
        );

        let err = load_federation(&fed, root.path(), None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Manifest {
                source: capstan_manifest::ManifestError::EntrypointOutsideJail { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_single_manifest_mode() {
        let root = TempDir::new().unwrap();
        let module_dir = root.path().join("ops");
        fs::create_dir_all(&module_dir).unwrap();
        write_script(&module_dir, "scripts/ping.sh");
        let manifest = write_manifest(&module_dir, &ping_cap("ops.ping"));

        let registry = load_single_manifest(&manifest, &module_dir, None).unwrap();
        assert_eq!(registry.modules().len(), 1);
        assert_eq!(registry.modules()[0].descriptor.id, "ops");
        assert!(registry.find("ops.ping").is_some());
    }
}
