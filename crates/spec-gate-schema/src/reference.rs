// crates/spec-gate-schema/src/reference.rs
// ============================================================================
// Module: Reference Schema
// Description: Loading and compilation of the structural reference schema.
// Purpose: Fail fast on unusable reference data and expose compiled checks.
// Dependencies: jsonschema, serde_json
// ============================================================================

//! ## Overview
//! The reference schema is a JSON Schema document describing the expected
//! structure of a submitted spec. Besides the structural constraints, its
//! `properties.openapi.pattern` field carries the accepted version pattern.
//! Every problem with the document is fatal: a missing pattern, an invalid
//! regular expression, or a schema that does not compile. The version
//! pattern runs on the same regex engine as the schema's own `pattern`
//! keywords, anchored at the start of the value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reference schema bundled with the crate.
const BUILTIN_SCHEMA: &str = include_str!("../assets/openapi_standard_schema.json");
/// Maximum reference schema size in bytes.
const MAX_SCHEMA_BYTES: u64 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reference schema failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// I/O failure while reading the schema document.
    #[error("reference schema io error: {0}")]
    Io(String),
    /// Schema document is not valid JSON.
    #[error("reference schema parse error: {0}")]
    Parse(String),
    /// `properties.openapi.pattern` is missing or not a string.
    #[error("reference schema is missing properties.openapi.pattern")]
    MissingVersionPattern,
    /// Version pattern is not a valid regular expression.
    #[error("invalid version pattern: {0}")]
    InvalidVersionPattern(String),
    /// Schema document could not be compiled.
    #[error("invalid reference schema: {0}")]
    Compile(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// First structural violation found in a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Rendered location inside the spec, or `None` at the document root.
    pub path: Option<String>,
    /// Human-readable violation message from the schema engine.
    pub message: String,
}

/// Compiled reference schema.
///
/// # Invariants
/// - Immutable once built; safe to share across runs and threads.
pub struct ReferenceSchema {
    /// Raw schema document.
    document: Value,
    /// Source text of the version pattern.
    version_pattern_source: String,
    /// Validator accepting strings that start with a version pattern match.
    version_check: Validator,
    /// Compiled structural validator.
    validator: Validator,
}

impl ReferenceSchema {
    /// Loads a reference schema from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the file is unreadable, malformed, or unusable.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let metadata =
            fs::metadata(path).map_err(|err| SchemaError::Io(format!("{}: {err}", path.display())))?;
        if metadata.len() > MAX_SCHEMA_BYTES {
            return Err(SchemaError::Io(format!("{}: exceeds size limit", path.display())));
        }
        let bytes =
            fs::read(path).map_err(|err| SchemaError::Io(format!("{}: {err}", path.display())))?;
        Self::from_slice(&bytes)
    }

    /// Parses a reference schema from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the bytes are malformed or unusable.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|err| SchemaError::Parse(err.to_string()))?;
        Self::from_value(document)
    }

    /// Compiles a reference schema from a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the version pattern or schema is unusable.
    pub fn from_value(document: Value) -> Result<Self, SchemaError> {
        let version_pattern_source = document
            .pointer("/properties/openapi/pattern")
            .and_then(Value::as_str)
            .ok_or(SchemaError::MissingVersionPattern)?
            .to_string();
        let version_check = jsonschema::options()
            .build(&json!({
                "type": "string",
                "pattern": format!("^(?:{version_pattern_source})")
            }))
            .map_err(|err| SchemaError::InvalidVersionPattern(err.to_string()))?;
        let validator = jsonschema::options()
            .build(&document)
            .map_err(|err| SchemaError::Compile(err.to_string()))?;
        Ok(Self {
            document,
            version_pattern_source,
            version_check,
            validator,
        })
    }

    /// Returns the OpenAPI 3.x schema bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the bundled document is unusable.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_slice(BUILTIN_SCHEMA.as_bytes())
    }

    /// Returns the raw schema document.
    #[must_use]
    pub const fn document(&self) -> &Value {
        &self.document
    }

    /// Returns the version pattern source text.
    #[must_use]
    pub fn version_pattern(&self) -> &str {
        &self.version_pattern_source
    }

    /// Returns the declared version when it satisfies the version pattern.
    ///
    /// The pattern must match at the start of the value; a missing or
    /// non-string `openapi` field never matches.
    #[must_use]
    pub fn matching_version<'a>(&self, spec: &'a Value) -> Option<&'a str> {
        let declared = spec.get("openapi")?;
        let version = declared.as_str()?;
        self.version_check.is_valid(declared).then_some(version)
    }

    /// Returns the first structural violation, if any.
    #[must_use]
    pub fn first_violation(&self, spec: &Value) -> Option<SchemaViolation> {
        let error = self.validator.iter_errors(spec).next()?;
        Some(SchemaViolation {
            path: render_instance_path(spec, error.instance_path().as_str()),
            message: error.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a JSON pointer into `spec` as `key.key[0].key`.
///
/// A segment is bracketed only when the node it indexes is an array, so
/// numeric object keys such as status codes stay dotted.
fn render_instance_path(spec: &Value, pointer: &str) -> Option<String> {
    let segments = pointer.strip_prefix('/')?.split('/');
    let mut rendered = String::new();
    let mut node = Some(spec);
    let mut first = true;
    for raw in segments {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        match node {
            Some(Value::Array(items)) => {
                let index = segment.parse::<usize>().ok();
                rendered.push('[');
                rendered.push_str(&segment);
                rendered.push(']');
                node = index.and_then(|index| items.get(index));
            }
            other => {
                if !first {
                    rendered.push('.');
                }
                rendered.push_str(&segment);
                node = other.and_then(|value| value.get(segment.as_str()));
            }
        }
        first = false;
    }
    Some(rendered)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
