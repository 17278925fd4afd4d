//! Capstan CLI - operator front end for the capability runtime.
//!
//! Loads a federation (or a single capability manifest with `--manifest`),
//! then lists, describes, validates, invokes, or health-probes what it
//! loaded. Command output goes to stdout; logs go to stderr.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

/// Capstan - federated capability execution runtime
#[derive(Parser)]
#[command(name = "capstan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Federation manifest path
    #[arg(
        long,
        global = true,
        env = "CAPSTAN_FEDERATION",
        default_value = "federation.json"
    )]
    federation: PathBuf,

    /// Load a single capability manifest instead of a federation
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Root directory module paths resolve against (defaults to the
    /// federation manifest's parent directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Load only these module ids (repeatable)
    #[arg(long = "module", global = true)]
    modules: Vec<String>,

    /// Append telemetry events to this JSONL file
    #[arg(long, global = true, env = "CAPSTAN_TELEMETRY")]
    telemetry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List enabled capabilities
    List {
        /// Print the full module index as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one capability's full contract
    Describe {
        /// Capability id
        id: String,
    },

    /// Invoke a capability and print the result as JSON
    Invoke {
        /// Capability id
        id: String,

        /// Inputs as a JSON object
        #[arg(long, default_value = "{}")]
        inputs: String,
    },

    /// Load all manifests and report the first violation, if any
    Validate,

    /// Run declared module health commands
    Health {
        /// Probe only this module
        #[arg(long)]
        module: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    capstan_telemetry::init_logging(cli.verbose);

    match cli.command {
        Commands::List { json } => {
            let registry = commands::load_registry(&cli)?;
            commands::list::run(&registry, json)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Describe { ref id } => {
            let registry = commands::load_registry(&cli)?;
            commands::describe::run(&registry, id)?;
            Ok(ExitCode::SUCCESS)
        },
        Commands::Invoke { ref id, ref inputs } => {
            let registry = commands::load_registry(&cli)?;
            commands::invoke::run(registry, cli.telemetry.as_deref(), id, inputs).await
        },
        Commands::Validate => commands::validate::run(&cli),
        Commands::Health { ref module } => {
            let registry = commands::load_registry(&cli)?;
            commands::health::run(&registry, module.as_deref()).await
        },
    }
}
