//! Input validator synthesis.
//!
//! Each capability declares a structural input schema (named properties, a
//! required subset, an additional-properties policy). The synthesized
//! validator checks presence and the extras policy only; value types are
//! deliberately opaque, since deep validation belongs to the capability's own
//! argument parsing.

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

static NON_ALNUM: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("[^0-9A-Za-z]+").expect("literal pattern compiles"));

/// Fallback token when an identifier sanitizes to nothing.
const FALLBACK_NAME: &str = "capability";

/// Fold an arbitrary capability id into a collision-safe symbol name:
/// non-alphanumeric runs become single underscores, leading/trailing
/// underscores are trimmed, and an empty result falls back to `capability`.
#[must_use]
pub fn sanitize_identifier(id: &str) -> String {
    let folded = NON_ALNUM.replace_all(id, "_");
    let trimmed = folded.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rejected caller inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// A required property is absent.
    #[error("missing required input '{0}'")]
    MissingRequired(String),

    /// The schema forbids additional properties and the caller supplied one.
    #[error("unexpected input '{0}' (schema forbids additional properties)")]
    Unexpected(String),
}

/// Presence/extras validator synthesized from a capability's input schema.
#[derive(Debug, Clone)]
pub struct InputValidator {
    name: String,
    declared: BTreeSet<String>,
    required: BTreeSet<String>,
    deny_additional: bool,
}

impl InputValidator {
    /// Build the validator for one capability.
    ///
    /// Non-object schemas (including absent ones) validate everything:
    /// no declared properties, no required subset, extras allowed.
    #[must_use]
    pub fn for_capability(capability_id: &str, schema: &Value) -> Self {
        let name = sanitize_identifier(capability_id);

        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect())
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let deny_additional = schema.get("additionalProperties") == Some(&Value::Bool(false));

        Self {
            name,
            declared: properties,
            required,
            deny_additional,
        }
    }

    /// The sanitized, collision-safe validator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check caller-supplied inputs: every required property present, and no
    /// extras when the schema forbids them.
    ///
    /// # Errors
    ///
    /// Returns the first [`InputError`] encountered, required fields checked
    /// before extras.
    pub fn validate(&self, inputs: &Map<String, Value>) -> Result<(), InputError> {
        for field in &self.required {
            if !inputs.contains_key(field) {
                return Err(InputError::MissingRequired(field.clone()));
            }
        }
        if self.deny_additional {
            for key in inputs.keys() {
                if !self.declared.contains(key) {
                    return Err(InputError::Unexpected(key.clone()));
                }
            }
        }
        Ok(())
    }
}
