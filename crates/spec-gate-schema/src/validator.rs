// crates/spec-gate-schema/src/validator.rs
// ============================================================================
// Module: Schema Validator
// Description: Builds the three-section structural compliance report.
// Purpose: Deterministic syntax, version, and schema findings for a spec.
// Dependencies: spec-gate-core, crate::reference
// ============================================================================

//! ## Overview
//! [`SchemaValidator`] synthesizes three fixed sections: the detected syntax,
//! version compatibility against the reference pattern, and full structural
//! validation. Output depends only on the request and the reference schema,
//! so repeated runs produce identical reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use spec_gate_core::NoopAuditSink;
use spec_gate_core::Report;
use spec_gate_core::ReportSection;
use spec_gate_core::ReportSectionRule;
use spec_gate_core::RequestModel;
use spec_gate_core::ResponseModel;
use spec_gate_core::RunOutcome;
use spec_gate_core::ValidationAuditSink;
use spec_gate_core::ValidationRunEvent;
use spec_gate_core::ValidationRunEventParams;
use spec_gate_core::ValidatorKind;

use crate::reference::ReferenceSchema;
use crate::reference::SchemaError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the report produced by the schema validator.
pub const REPORT_NAME: &str = "OpenAPI Standard";
/// Recommendation when the spec satisfies the reference schema.
pub const COMPLIANT_MESSAGE: &str = "Complies to OpenAPI schema.";
/// Recommendation when the declared version is absent or unsupported.
pub const VERSION_FAILED_MESSAGE: &str = "Version compatibility check failed.";
/// Path label used when a violation has no location inside the spec.
const UNKNOWN_PATH: &str = "Unknown path";

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Deterministic structural validator.
pub struct SchemaValidator {
    /// Compiled reference schema.
    reference: Arc<ReferenceSchema>,
    /// Audit sink for run events.
    audit: Arc<dyn ValidationAuditSink>,
}

impl SchemaValidator {
    /// Creates a validator over a compiled reference schema.
    #[must_use]
    pub fn new(reference: Arc<ReferenceSchema>) -> Self {
        Self {
            reference,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn ValidationAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Validates a request and returns the report with no validator errors.
    #[must_use]
    pub fn validate(&self, request: &RequestModel) -> ResponseModel {
        let started = Instant::now();
        let report = self.build_report(request);
        self.audit.record_run(&ValidationRunEvent::new(ValidationRunEventParams {
            validator: ValidatorKind::Schema,
            report_name: report.name.clone(),
            sections: report.sections.len(),
            rules: report.rule_count(),
            failed_rules: 0,
            outcome: RunOutcome::Completed,
            duration_ms: started.elapsed().as_millis(),
        }));
        ResponseModel::clean(report)
    }

    /// Builds the three-section report for a request.
    #[must_use]
    pub fn build_report(&self, request: &RequestModel) -> Report {
        Report {
            name: REPORT_NAME.to_string(),
            sections: vec![
                single_rule_section(
                    "1.0",
                    "Syntax validation",
                    "Check if the provided spec is valid JSON or YAML.",
                    request.format().label().to_string(),
                ),
                single_rule_section(
                    "2.0",
                    "Version compatibility",
                    "Verify the spec matches the declared OpenAPI version.",
                    self.version_recommendation(request),
                ),
                single_rule_section(
                    "3.0",
                    "Schema validation",
                    "Ensure the spec adheres to the OpenAPI schema structure.",
                    self.schema_recommendation(request),
                ),
            ],
        }
    }

    /// Returns the version compatibility finding.
    fn version_recommendation(&self, request: &RequestModel) -> String {
        self.reference.matching_version(request.spec()).map_or_else(
            || VERSION_FAILED_MESSAGE.to_string(),
            |version| format!("Version compatibility check passed. (Version {version})"),
        )
    }

    /// Returns the structural validation finding.
    fn schema_recommendation(&self, request: &RequestModel) -> String {
        match self.reference.first_violation(request.spec()) {
            None => COMPLIANT_MESSAGE.to_string(),
            Some(violation) => format!(
                "Error at {}: {}",
                violation.path.as_deref().unwrap_or(UNKNOWN_PATH),
                violation.message
            ),
        }
    }
}

/// Loads the reference schema from disk and validates one request.
///
/// # Errors
///
/// Returns [`SchemaError`] when the reference schema cannot be loaded.
pub fn validate_with_schema_file(
    request: &RequestModel,
    schema_path: &Path,
) -> Result<ResponseModel, SchemaError> {
    let reference = ReferenceSchema::load(schema_path)?;
    Ok(SchemaValidator::new(Arc::new(reference)).validate(request))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a section holding one automated rule.
fn single_rule_section(id: &str, name: &str, rule: &str, recommendation: String) -> ReportSection {
    ReportSection {
        id: id.to_string(),
        name: name.to_string(),
        rules: vec![ReportSectionRule {
            rule: rule.to_string(),
            human_review: false,
            recommendation,
        }],
    }
}
