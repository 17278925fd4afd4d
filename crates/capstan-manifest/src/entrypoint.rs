//! Entrypoint path resolution and jail checks.
//!
//! Resolution is lexical: `.` and `..` components are folded without
//! following symlinks, and a symlinked entrypoint is rejected outright so a
//! post-load relink cannot move the target outside the jail.

use std::path::{Component, Path, PathBuf};

use crate::error::{ManifestError, ManifestResult};
use crate::guardrails::Guardrails;

/// Placeholder token expanded to the runtime's workspace root.
pub const WORKSPACE_ROOT_TOKEN: &str = "${WORKSPACE_ROOT}";

/// Fold `.` and `..` components out of a path without touching the
/// filesystem. `..` at the root is retained (it cannot be folded away), which
/// is fine for jail checks: such a path will simply fail the prefix test.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            },
            other => out.push(other),
        }
    }
    out
}

/// Resolve a declared entrypoint against the module's layout and verify it
/// stays inside the jail.
///
/// A `${WORKSPACE_ROOT}` prefix resolves against `repo_root`; any other
/// relative path resolves against `manifest_dir`. The checks run in order:
/// exists, not a directory, not a symlink, under `repo_root`, under at least
/// one of `allowed_entrypoint_roots` (when any are declared).
pub(crate) fn resolve_entrypoint(
    capability: &str,
    entrypoint: &str,
    repo_root: &Path,
    manifest_dir: &Path,
    guardrails: &Guardrails,
) -> ManifestResult<PathBuf> {
    let raw = if let Some(rest) = entrypoint.strip_prefix(WORKSPACE_ROOT_TOKEN) {
        repo_root.join(rest.trim_start_matches('/'))
    } else {
        let declared = Path::new(entrypoint);
        if declared.is_absolute() {
            declared.to_path_buf()
        } else {
            manifest_dir.join(declared)
        }
    };
    let resolved = normalize_lexically(&raw);

    if !resolved.exists() && resolved.symlink_metadata().is_err() {
        return Err(ManifestError::EntrypointNotFound {
            capability: capability.to_string(),
            path: resolved,
        });
    }
    if resolved.is_dir() {
        return Err(ManifestError::EntrypointIsDirectory {
            capability: capability.to_string(),
            path: resolved,
        });
    }
    if resolved.symlink_metadata().is_ok_and(|m| m.file_type().is_symlink()) {
        return Err(ManifestError::EntrypointIsSymlink {
            capability: capability.to_string(),
            path: resolved,
        });
    }

    let root = normalize_lexically(repo_root);
    if !resolved.starts_with(&root) {
        return Err(ManifestError::EntrypointOutsideJail {
            capability: capability.to_string(),
            path: resolved,
            jail: root,
        });
    }

    if !guardrails.allowed_entrypoint_roots.is_empty() {
        let permitted = guardrails
            .allowed_entrypoint_roots
            .iter()
            .map(|rel| normalize_lexically(&root.join(rel)))
            .any(|prefix| resolved.starts_with(&prefix));
        if !permitted {
            return Err(ManifestError::EntrypointOutsideJail {
                capability: capability.to_string(),
                path: resolved,
                jail: root,
            });
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "#!/bin/sh\n").unwrap();
    }

    #[test]
    fn test_normalize_folds_parent_dirs() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
    }

    #[test]
    fn test_relative_to_manifest_dir() {
        let root = TempDir::new().unwrap();
        let manifest_dir = root.path().join("mcp");
        touch(&root.path().join("scripts/run.sh"));
        fs::create_dir_all(&manifest_dir).unwrap();

        let resolved = resolve_entrypoint(
            "cap",
            "../scripts/run.sh",
            root.path(),
            &manifest_dir,
            &Guardrails::default(),
        )
        .unwrap();
        assert_eq!(resolved, normalize_lexically(&root.path().join("scripts/run.sh")));
    }

    #[test]
    fn test_workspace_root_token() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("scripts/run.sh"));

        let resolved = resolve_entrypoint(
            "cap",
            "${WORKSPACE_ROOT}/scripts/run.sh",
            root.path(),
            &root.path().join("mcp"),
            &Guardrails::default(),
        )
        .unwrap();
        assert!(resolved.ends_with("scripts/run.sh"));
    }

    #[test]
    fn test_missing_entrypoint() {
        let root = TempDir::new().unwrap();
        let err = resolve_entrypoint(
            "cap",
            "nope.sh",
            root.path(),
            root.path(),
            &Guardrails::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EntrypointNotFound { .. }));
    }

    #[test]
    fn test_directory_entrypoint() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("scripts")).unwrap();
        let err = resolve_entrypoint(
            "cap",
            "scripts",
            root.path(),
            root.path(),
            &Guardrails::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EntrypointIsDirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entrypoint() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("real.sh"));
        std::os::unix::fs::symlink(root.path().join("real.sh"), root.path().join("link.sh"))
            .unwrap();
        let err = resolve_entrypoint(
            "cap",
            "link.sh",
            root.path(),
            root.path(),
            &Guardrails::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EntrypointIsSymlink { .. }));
    }

    #[test]
    fn test_escape_via_parent_dirs() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch(&outside.path().join("evil.sh"));
        let manifest_dir = root.path().join("mcp");
        fs::create_dir_all(&manifest_dir).unwrap();

        // Enough ../ to land in the sibling temp dir.
        let rel = format!(
            "../../{}/evil.sh",
            outside.path().file_name().unwrap().to_string_lossy()
        );
        let err = resolve_entrypoint(
            "cap",
            &rel,
            root.path(),
            &manifest_dir,
            &Guardrails::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EntrypointOutsideJail { .. }));
    }

    #[test]
    fn test_allowed_roots_restrict() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("other/run.sh"));
        let guardrails = Guardrails {
            allowed_entrypoint_roots: BTreeSet::from(["scripts".to_string()]),
            ..Guardrails::default()
        };
        let err = resolve_entrypoint(
            "cap",
            "other/run.sh",
            root.path(),
            root.path(),
            &guardrails,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EntrypointOutsideJail { .. }));
    }

    #[test]
    fn test_allowed_roots_permit() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("scripts/run.sh"));
        let guardrails = Guardrails {
            allowed_entrypoint_roots: BTreeSet::from(["scripts".to_string()]),
            ..Guardrails::default()
        };
        resolve_entrypoint(
            "cap",
            "scripts/run.sh",
            root.path(),
            root.path(),
            &guardrails,
        )
        .unwrap();
    }
}
