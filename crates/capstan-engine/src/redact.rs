//! Ordered redaction of captured output.

use capstan_manifest::Guardrails;
use regex::Regex;

/// Applies a capability's redaction patterns, in declaration order, to
/// captured streams. Patterns are compiled once at construction; they were
/// already compile-checked at manifest load.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    patterns: Vec<Regex>,
    replacement: String,
}

impl Redactor {
    /// Build the redactor for a capability's guardrails.
    #[must_use]
    pub fn from_guardrails(capability_id: &str, guardrails: &Guardrails) -> Self {
        // Patterns were validated at load time; a compile failure here would
        // mean the manifest was never parsed through the front door.
        let patterns = guardrails
            .compiled_redact_patterns(capability_id)
            .unwrap_or_default();
        Self {
            patterns,
            replacement: guardrails.redact_replacement.clone(),
        }
    }

    /// Substitute every pattern match with the replacement token, patterns
    /// applied in declaration order.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for pattern in &self.patterns {
            if pattern.is_match(&current) {
                current = pattern
                    .replace_all(&current, self.replacement.as_str())
                    .into_owned();
            }
        }
        current
    }
}
