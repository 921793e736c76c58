// crates/spec-gate-schema/src/lib.rs
// ============================================================================
// Module: Spec Gate Schema Validator
// Description: Structural and version checks against a reference schema.
// Purpose: Produce the deterministic "OpenAPI Standard" report.
// Dependencies: spec-gate-core, jsonschema
// ============================================================================

//! ## Overview
//! The schema validator runs entirely locally: it reports the detected
//! document format, checks the declared `openapi` version against the
//! reference schema's version pattern, and validates the whole document
//! against the reference schema, surfacing the first violation only.
//! Loading the reference schema is the only fallible step; validation itself
//! always yields a complete report.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod reference;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use reference::ReferenceSchema;
pub use reference::SchemaError;
pub use reference::SchemaViolation;
pub use validator::COMPLIANT_MESSAGE;
pub use validator::REPORT_NAME;
pub use validator::SchemaValidator;
pub use validator::VERSION_FAILED_MESSAGE;
pub use validator::validate_with_schema_file;
