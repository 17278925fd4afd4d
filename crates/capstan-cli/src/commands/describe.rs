//! Show one capability's full contract.

use anyhow::{Result, bail};
use capstan_registry::Registry;
use colored::Colorize;
use serde_json::Value;

fn print_schema(label: &str, schema: &Value) -> Result<()> {
    if schema.is_null() {
        println!("  {} {}", label.cyan(), "(none)".dimmed());
        return Ok(());
    }
    println!("  {}", label.cyan());
    for line in serde_json::to_string_pretty(schema)?.lines() {
        println!("    {line}");
    }
    Ok(())
}

pub(crate) fn run(registry: &Registry, id: &str) -> Result<()> {
    let Some((module, entry)) = registry.find(id) else {
        bail!("capability '{id}' not found");
    };
    let capability = &entry.capability;

    println!("{}", capability.id.bold());
    println!("  {} {}", "summary".cyan(), capability.summary);
    println!("  {} {}", "module".cyan(), module.descriptor.id);
    println!("  {} {}", "entrypoint".cyan(), entry.entrypoint.display());
    println!(
        "  {} {}",
        "exposed".cyan(),
        if capability.is_exposed() { "yes" } else { "no" }
    );
    if let Some(owner) = &capability.metadata.owner {
        println!("  {} {}", "owner".cyan(), owner);
    }
    if !capability.metadata.tags.is_empty() {
        println!("  {} {}", "tags".cyan(), capability.metadata.tags.join(", "));
    }
    print_schema("inputs", &capability.inputs)?;
    print_schema("outputs", &capability.outputs)?;
    println!("  {}", "guardrails".cyan());
    for line in serde_json::to_string_pretty(&capability.guardrails)?.lines() {
        println!("    {line}");
    }
    Ok(())
}
