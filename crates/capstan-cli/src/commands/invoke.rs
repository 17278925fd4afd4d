//! Invoke a capability and print the structured result.

use anyhow::{Context, Result, bail};
use capstan_engine::Gateway;
use capstan_registry::Registry;
use capstan_telemetry::TelemetrySink;
use serde_json::Value;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

pub(crate) async fn run(
    registry: Registry,
    telemetry: Option<&Path>,
    id: &str,
    inputs: &str,
) -> Result<ExitCode> {
    let inputs: Value = serde_json::from_str(inputs).context("--inputs is not valid JSON")?;
    let Value::Object(inputs) = inputs else {
        bail!("--inputs must be a JSON object");
    };

    let sink = match telemetry {
        Some(path) => TelemetrySink::to_path(path)?,
        None => TelemetrySink::disabled(),
    };
    let gateway = Gateway::new(Arc::new(registry), sink);

    let result = gateway.invoke(id, inputs).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
