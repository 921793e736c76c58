// crates/spec-gate-core/src/core/loader.rs
// ============================================================================
// Module: Spec Loader
// Description: Parses uploaded bytes as JSON or YAML and records the format.
// Purpose: Produce a RequestModel with strict size and encoding limits.
// Dependencies: serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Uploaded specs are untrusted. The loader enforces a size limit and UTF-8
//! encoding, then tries JSON before YAML. The first parser that accepts the
//! document decides the reported [`SpecFormat`]. Since YAML is a superset of
//! JSON, a JSON document is always reported as JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::core::model::RequestModel;
use crate::core::model::SpecFormat;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted document size in bytes.
pub const MAX_SPEC_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Spec loading failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum SpecLoadError {
    /// I/O failure while reading the document.
    #[error("spec io error: {0}")]
    Io(String),
    /// Document exceeds [`MAX_SPEC_BYTES`].
    #[error("spec exceeds size limit ({size} > {limit} bytes)")]
    TooLarge {
        /// Observed size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
    /// Document is not valid UTF-8.
    #[error("spec must be utf-8")]
    NotUtf8,
    /// Document is empty or whitespace only.
    #[error("spec is empty")]
    Empty,
    /// Neither the JSON nor the YAML parser accepted the document.
    #[error("spec is neither valid JSON nor valid YAML: json: {json_error}; yaml: {yaml_error}")]
    Unparseable {
        /// JSON parser error.
        json_error: String,
        /// YAML parser error.
        yaml_error: String,
    },
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Parses raw document bytes, returning the detected format and value.
///
/// # Errors
///
/// Returns [`SpecLoadError`] when the document is oversized, not UTF-8,
/// empty, or rejected by both parsers.
pub fn parse_document(bytes: &[u8]) -> Result<(SpecFormat, Value), SpecLoadError> {
    if bytes.len() > MAX_SPEC_BYTES {
        return Err(SpecLoadError::TooLarge {
            size: bytes.len(),
            limit: MAX_SPEC_BYTES,
        });
    }
    let text = std::str::from_utf8(bytes).map_err(|_| SpecLoadError::NotUtf8)?;
    if text.trim().is_empty() {
        return Err(SpecLoadError::Empty);
    }
    let json_error = match serde_json::from_str::<Value>(text) {
        Ok(value) => return Ok((SpecFormat::Json, value)),
        Err(err) => err.to_string(),
    };
    match serde_yaml::from_str::<Value>(text) {
        Ok(value) => Ok((SpecFormat::Yaml, value)),
        Err(err) => Err(SpecLoadError::Unparseable {
            json_error,
            yaml_error: err.to_string(),
        }),
    }
}

/// Loads a spec from raw bytes.
///
/// # Errors
///
/// Returns [`SpecLoadError`] when the bytes cannot be parsed.
pub fn load_spec(bytes: &[u8]) -> Result<RequestModel, SpecLoadError> {
    let (format, spec) = parse_document(bytes)?;
    Ok(RequestModel::new(format, spec))
}

/// Loads a spec from a file on disk.
///
/// # Errors
///
/// Returns [`SpecLoadError`] when the file cannot be read or parsed.
pub fn load_spec_file(path: &Path) -> Result<RequestModel, SpecLoadError> {
    let bytes = read_limited(path)?;
    load_spec(&bytes)
}

/// Reads a file after checking its size against [`MAX_SPEC_BYTES`].
pub(crate) fn read_limited(path: &Path) -> Result<Vec<u8>, SpecLoadError> {
    let metadata = fs::metadata(path)
        .map_err(|err| SpecLoadError::Io(format!("{}: {err}", path.display())))?;
    let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
    if size > MAX_SPEC_BYTES {
        return Err(SpecLoadError::TooLarge {
            size,
            limit: MAX_SPEC_BYTES,
        });
    }
    fs::read(path).map_err(|err| SpecLoadError::Io(format!("{}: {err}", path.display())))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
