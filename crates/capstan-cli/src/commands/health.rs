//! Run declared module health commands.

use anyhow::{Result, bail};
use capstan_engine::run_health_command;
use capstan_registry::Registry;
use colored::Colorize;
use std::process::ExitCode;

pub(crate) async fn run(registry: &Registry, only: Option<&str>) -> Result<ExitCode> {
    if let Some(id) = only {
        if !registry.modules().iter().any(|m| m.descriptor.id == id) {
            bail!("module '{id}' not loaded");
        }
    }

    let mut all_passed = true;
    let mut probed = false;
    for module in registry.modules() {
        if only.is_some_and(|id| id != module.descriptor.id) {
            continue;
        }
        let probes = &module.descriptor.health.commands;
        if probes.is_empty() {
            continue;
        }

        println!("{}", module.descriptor.id.cyan().bold());
        for probe in probes {
            probed = true;
            let outcome = run_health_command(probe, &module.repo_root).await;
            let verdict = if outcome.passed {
                "OK".green()
            } else if outcome.timed_out {
                "TIMEOUT".red()
            } else {
                "FAIL".red()
            };
            println!(
                "  {verdict} {} ({:.2}s)",
                outcome.label, outcome.duration_seconds
            );
            if !outcome.passed {
                all_passed = false;
                for line in outcome.stderr.lines() {
                    println!("    {}", line.dimmed());
                }
            }
        }
    }

    if !probed {
        println!("{}", "no health commands declared".dimmed());
    }
    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
