//! The caller-facing invocation façade.

use capstan_registry::{InputError, InputValidator, Registry};
use capstan_telemetry::TelemetrySink;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::ExecutionEngine;
use crate::result::InvocationResult;

/// Façade-level errors, kept distinct from invocation failures: a lookup
/// miss or rejected inputs means nothing ran, while a spawn failure or bad
/// exit code is reported inside an [`InvocationResult`].
#[derive(Debug, Error)]
pub enum InvokeError {
    /// No capability with this id is registered.
    #[error("capability '{0}' not found")]
    CapabilityNotFound(String),

    /// The capability exists but is not exposed for external invocation.
    #[error("capability '{0}' is not exposed for invocation")]
    NotExposed(String),

    /// The caller's inputs failed the synthesized schema.
    #[error("capability '{capability}' rejected inputs (validator {validator}): {source}")]
    InvalidInputs {
        /// The capability whose validator rejected the inputs.
        capability: String,
        /// The sanitized name of the validator that rejected them.
        validator: String,
        /// The underlying rejection.
        source: InputError,
    },
}

/// Looks capabilities up by id, validates caller inputs, and drives the
/// engine. One gateway serves all modules of a loaded federation.
pub struct Gateway {
    registry: Arc<Registry>,
    engine: ExecutionEngine,
    validators: HashMap<String, InputValidator>,
}

impl Gateway {
    /// Build a gateway over a loaded registry. Validators are synthesized
    /// once per capability here, not per call.
    #[must_use]
    pub fn new(registry: Arc<Registry>, telemetry: TelemetrySink) -> Self {
        let engine = ExecutionEngine::new(&registry, telemetry);
        let validators = registry
            .modules()
            .iter()
            .flat_map(|module| &module.entries)
            .map(|entry| {
                let capability = &entry.capability;
                (
                    capability.id.clone(),
                    InputValidator::for_capability(&capability.id, &capability.inputs),
                )
            })
            .collect();
        Self {
            registry,
            engine,
            validators,
        }
    }

    /// The registry this gateway serves.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Invoke a capability by id with named inputs.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the capability is unknown, not exposed,
    /// or the inputs fail validation — all before anything runs. Once the
    /// engine takes over, failures are captured in the returned
    /// [`InvocationResult`] instead.
    pub async fn invoke(
        &self,
        capability_id: &str,
        inputs: Map<String, Value>,
    ) -> Result<InvocationResult, InvokeError> {
        let (module, entry) = self
            .registry
            .find(capability_id)
            .ok_or_else(|| InvokeError::CapabilityNotFound(capability_id.to_string()))?;

        if !entry.capability.is_exposed() {
            return Err(InvokeError::NotExposed(capability_id.to_string()));
        }

        if let Some(validator) = self.validators.get(capability_id) {
            validator
                .validate(&inputs)
                .map_err(|source| InvokeError::InvalidInputs {
                    capability: capability_id.to_string(),
                    validator: validator.name().to_string(),
                    source,
                })?;
        }

        Ok(self.engine.invoke(module, entry, &inputs).await)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("capabilities", &self.validators.len())
            .finish_non_exhaustive()
    }
}
