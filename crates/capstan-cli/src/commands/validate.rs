//! Load everything and report the first violation.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use crate::Cli;
use crate::commands::load_registry;

pub(crate) fn run(cli: &Cli) -> Result<ExitCode> {
    match load_registry(cli) {
        Ok(registry) => {
            println!(
                "{} {} modules, {} capabilities enabled",
                "OK".green().bold(),
                registry.modules().len(),
                registry.enabled_capabilities().count()
            );
            Ok(ExitCode::SUCCESS)
        },
        Err(err) => {
            eprintln!("{} {err:#}", "FAIL".red().bold());
            Ok(ExitCode::FAILURE)
        },
    }
}
