//! Document validation: JSON Schema envelope check, then a schema-less decode.

use serde_json::Value;
use tracing::debug;

use crate::error::{SchemaError, ValidateError};
use crate::generic::GenericDocument;
use crate::types::DecodingOptions;

/// JSON Schema (draft-07) of the JSON:API top-level document shape.
pub const ENVELOPE_SCHEMA: &str = include_str!("../schema/document.schema.json");

/// The bundled envelope schema as a JSON value.
pub fn envelope_schema() -> Result<Value, ValidateError> {
    serde_json::from_str(ENVELOPE_SCHEMA).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })
}

/// Validate a raw document against the bundled envelope schema.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` with one entry per violation.
pub fn validate_envelope(document: &Value) -> Result<(), ValidateError> {
    validate_against_schema(&envelope_schema()?, document)
}

/// Validate a payload against an arbitrary JSON Schema.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
        message: e.to_string(),
    })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        debug!(count = errors.len(), "envelope validation failed");
        Err(ValidateError::Invalid { errors })
    }
}

/// Validate the envelope, then decode the document without a resource schema.
///
/// `options.strict` rejects documents carrying both `errors` and `data`.
pub fn check_document(
    document: &Value,
    options: &DecodingOptions,
) -> Result<GenericDocument, ValidateError> {
    validate_envelope(document)?;
    Ok(GenericDocument::decode_with(document, options)?)
}
