//! Subcommand implementations.

use anyhow::Result;
use capstan_registry::{Registry, load_federation, load_single_manifest};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Cli;

pub(crate) mod describe;
pub(crate) mod health;
pub(crate) mod invoke;
pub(crate) mod list;
pub(crate) mod validate;

fn parent_of(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Load a registry per the global flags: a single manifest when
/// `--manifest` is given, the federation otherwise.
pub(crate) fn load_registry(cli: &Cli) -> Result<Registry> {
    if let Some(manifest) = &cli.manifest {
        let root = cli.root.clone().unwrap_or_else(|| parent_of(manifest));
        debug!(manifest = %manifest.display(), root = %root.display(), "single-manifest mode");
        return Ok(load_single_manifest(manifest, &root, None)?);
    }
    let root = cli.root.clone().unwrap_or_else(|| parent_of(&cli.federation));
    debug!(federation = %cli.federation.display(), root = %root.display(), "federation mode");
    let subset = (!cli.modules.is_empty()).then_some(cli.modules.as_slice());
    Ok(load_federation(&cli.federation, &root, subset)?)
}
