//! List enabled capabilities.

use anyhow::Result;
use capstan_registry::Registry;
use colored::Colorize;

pub(crate) fn run(registry: &Registry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.module_index())?);
        return Ok(());
    }

    let mut any = false;
    for (module, entry) in registry.enabled_capabilities() {
        any = true;
        println!(
            "{}  {}  {}",
            entry.capability.id.bold(),
            format!("[{}]", module.descriptor.id).cyan(),
            entry.capability.summary.dimmed()
        );
    }
    if !any {
        println!("{}", "no capabilities enabled".dimmed());
    }
    Ok(())
}
