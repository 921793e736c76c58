// crates/spec-gate-schema/tests/schema_validator.rs
// ============================================================================
// Module: Schema Validator Tests
// Description: Syntax, version, and structural findings of the schema report.
// ============================================================================
//! ## Overview
//! Exercises the three fixed sections against the bundled reference schema
//! and against small purpose-built schemas.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use spec_gate_core::RequestModel;
use spec_gate_core::SpecFormat;
use spec_gate_core::load_spec;
use spec_gate_schema::COMPLIANT_MESSAGE;
use spec_gate_schema::REPORT_NAME;
use spec_gate_schema::ReferenceSchema;
use spec_gate_schema::SchemaValidator;
use spec_gate_schema::VERSION_FAILED_MESSAGE;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

fn builtin_validator() -> SchemaValidator {
    SchemaValidator::new(Arc::new(ReferenceSchema::builtin().unwrap()))
}

/// Reference schema with the strict `3.x.y` pattern and three required keys.
fn strict_validator() -> SchemaValidator {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "object",
        "required": ["openapi", "info", "paths"],
        "properties": {
            "openapi": {"type": "string", "pattern": "^3\\.\\d+\\.\\d+$"},
            "info": {"type": "object", "required": ["title", "version"]},
            "paths": {"type": "object"}
        }
    });
    SchemaValidator::new(Arc::new(ReferenceSchema::from_value(schema).unwrap()))
}

fn minimal_spec() -> Value {
    json!({
        "openapi": "3.0.1",
        "info": {"title": "Pets", "version": "1.0.0"},
        "paths": {}
    })
}

fn recommendation(validator: &SchemaValidator, spec: Value, section: usize) -> String {
    let response = validator.validate(&RequestModel::new(SpecFormat::Json, spec));
    response.report.sections[section].rules[0].recommendation.clone()
}

// ============================================================================
// SECTION: Report Shape
// ============================================================================

#[test]
fn report_has_three_fixed_sections() {
    let response = builtin_validator().validate(&RequestModel::new(SpecFormat::Json, minimal_spec()));
    assert!(response.errors.is_empty());
    assert_eq!(response.report.name, REPORT_NAME);
    let sections: Vec<(&str, &str)> = response
        .report
        .sections
        .iter()
        .map(|section| (section.id.as_str(), section.name.as_str()))
        .collect();
    assert_eq!(
        sections,
        vec![
            ("1.0", "Syntax validation"),
            ("2.0", "Version compatibility"),
            ("3.0", "Schema validation")
        ]
    );
    assert!(response.report.rules().all(|(_, rule)| !rule.human_review));
    assert!(response.report.is_complete());
}

#[test]
fn syntax_section_reports_detected_format() {
    let request = load_spec(b"openapi: 3.0.1\ninfo:\n  title: Pets\n  version: '1'\npaths: {}\n").unwrap();
    let response = builtin_validator().validate(&request);
    assert_eq!(response.report.sections[0].rules[0].recommendation, "YAML");

    let request = load_spec(minimal_spec().to_string().as_bytes()).unwrap();
    let response = builtin_validator().validate(&request);
    assert_eq!(response.report.sections[0].rules[0].recommendation, "JSON");
}

// ============================================================================
// SECTION: Version Compatibility
// ============================================================================

#[test]
fn matching_version_passes_and_echoes_value() {
    let message = recommendation(&strict_validator(), minimal_spec(), 1);
    assert!(message.contains("passed"), "{message}");
    assert!(message.contains("3.0.1"), "{message}");
}

#[test]
fn swagger_two_version_fails() {
    let message = recommendation(&strict_validator(), json!({"openapi": "2.0"}), 1);
    assert_eq!(message, VERSION_FAILED_MESSAGE);
}

#[test]
fn missing_version_fails() {
    let message = recommendation(&strict_validator(), json!({"info": {}}), 1);
    assert_eq!(message, VERSION_FAILED_MESSAGE);
}

#[test]
fn non_string_version_fails() {
    let message = recommendation(&strict_validator(), json!({"openapi": 3.0}), 1);
    assert_eq!(message, VERSION_FAILED_MESSAGE);
}

#[test]
fn non_object_spec_fails_without_panicking() {
    let validator = builtin_validator();
    assert_eq!(recommendation(&validator, json!("openapi: 3.0.1"), 1), VERSION_FAILED_MESSAGE);
    assert!(recommendation(&validator, json!([1, 2]), 2).starts_with("Error at Unknown path"));
}

// ============================================================================
// SECTION: Schema Validation
// ============================================================================

#[test]
fn conformant_minimal_spec_complies() {
    assert_eq!(recommendation(&strict_validator(), minimal_spec(), 2), COMPLIANT_MESSAGE);
    assert_eq!(recommendation(&builtin_validator(), minimal_spec(), 2), COMPLIANT_MESSAGE);
}

#[test]
fn missing_paths_reports_unknown_path_and_key() {
    let mut spec = minimal_spec();
    spec.as_object_mut().unwrap().remove("paths");
    let message = recommendation(&builtin_validator(), spec, 2);
    assert!(message.starts_with("Error at Unknown path: "), "{message}");
    assert!(message.contains("paths"), "{message}");
    assert!(message.contains("required"), "{message}");
}

#[test]
fn nested_violation_reports_dotted_path() {
    let mut spec = minimal_spec();
    spec["paths"] = json!({"/pets": {"get": {"summary": "List pets"}}});
    let message = recommendation(&builtin_validator(), spec, 2);
    assert!(message.starts_with("Error at paths./pets.get: "), "{message}");
    assert!(message.contains("responses"), "{message}");
}

#[test]
fn array_violation_reports_bracketed_index() {
    let mut spec = minimal_spec();
    spec["tags"] = json!([{"description": "no name"}]);
    let message = recommendation(&builtin_validator(), spec, 2);
    assert!(message.starts_with("Error at tags[0]: "), "{message}");
    assert!(message.contains("name"), "{message}");
}

#[test]
fn status_code_keys_render_as_dotted_keys() {
    let mut spec = minimal_spec();
    spec["paths"] = json!({"/pets": {"get": {"responses": {"200": {"description": 5}}}}});
    let message = recommendation(&builtin_validator(), spec, 2);
    assert!(
        message.starts_with("Error at paths./pets.get.responses.200.description: "),
        "{message}"
    );
    assert!(message.contains("string"), "{message}");
}

#[test]
fn response_without_description_or_ref_is_rejected() {
    let mut spec = minimal_spec();
    spec["paths"] = json!({"/pets": {"get": {"responses": {"404": {"content": {}}}}}});
    let message = recommendation(&builtin_validator(), spec, 2);
    assert!(message.starts_with("Error at paths./pets.get.responses.404: "), "{message}");
    assert!(message.contains("anyOf"), "{message}");
}

#[test]
fn referenced_response_needs_no_description() {
    let mut spec = minimal_spec();
    spec["paths"] = json!({
        "/pets": {"get": {"responses": {"default": {"$ref": "#/components/responses/Error"}}}}
    });
    assert_eq!(recommendation(&builtin_validator(), spec, 2), COMPLIANT_MESSAGE);
}

#[test]
fn only_first_violation_is_reported() {
    let spec = json!({"openapi": "3.0.1", "tags": [{}]});
    let message = recommendation(&builtin_validator(), spec, 2);
    assert_eq!(message.matches("Error at").count(), 1, "{message}");
}

#[test]
fn realistic_spec_complies_with_builtin_schema() {
    let spec = json!({
        "openapi": "3.0.3",
        "info": {"title": "Pets", "version": "1.0.0", "contact": {"name": "Platform"}},
        "servers": [{"url": "https://api.example.com/v1"}],
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "parameters": [{"name": "limit", "in": "query", "schema": {"type": "integer"}}],
                    "responses": {
                        "200": {
                            "description": "A list of pets",
                            "content": {"application/json": {"schema": {"type": "array"}}}
                        },
                        "default": {"$ref": "#/components/responses/Error"}
                    }
                }
            }
        },
        "components": {"responses": {"Error": {"description": "Unexpected error"}}}
    });
    assert_eq!(recommendation(&builtin_validator(), spec, 2), COMPLIANT_MESSAGE);
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn repeated_runs_are_byte_identical() {
    let validator = builtin_validator();
    let request = RequestModel::new(SpecFormat::Yaml, json!({"openapi": "3.0.1", "info": 7}));
    let first = serde_json::to_string(&validator.validate(&request)).unwrap();
    let second = serde_json::to_string(&validator.validate(&request)).unwrap();
    assert_eq!(first, second);
}
