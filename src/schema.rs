//! POST API JSON schemas

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of validation errors reported for one document
pub const MAX_VALIDATION_ERRORS: usize = 50;

/// A JSON schema as fetched from the POST API, kept both raw and decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    pub raw: String,
    pub decoded: Value,
}

impl JsonSchema {
    /// Decode a raw schema document, `None` if it is not valid JSON
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let decoded = serde_json::from_str(&raw).ok()?;
        Some(Self { raw, decoded })
    }

    /// Validate `data` against the schema.
    ///
    /// Returns at most [`MAX_VALIDATION_ERRORS`] messages, empty when valid.
    pub fn validate(&self, data: &Value) -> Vec<String> {
        let validator = match jsonschema::validator_for(&self.decoded) {
            Ok(validator) => validator,
            Err(e) => {
                tracing::warn!(error = %e, "Unusable JSON schema");
                return vec![format!("Invalid JSON schema: {}", e)];
            }
        };

        validator
            .iter_errors(data)
            .take(MAX_VALIDATION_ERRORS)
            .map(|error| error.to_string())
            .collect()
    }
}

/// Validate against an optional schema; a missing schema is itself an error
pub fn validate(schema: Option<&JsonSchema>, data: &Value) -> Vec<String> {
    match schema {
        Some(schema) => schema.validate(data),
        None => vec!["Unable to retrieve the JSON schema to validate the data.".to_string()],
    }
}
