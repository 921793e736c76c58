// crates/spec-gate-core/src/core/model.rs
// ============================================================================
// Module: Report Model
// Description: Request, report, and response types shared by validators.
// Purpose: Give every validator one output shape so renderers need no special cases.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A validation run consumes a [`RequestModel`] and returns a
//! [`ResponseModel`]. The [`Report`] inside is an ordered tree of sections
//! and rule outcomes; both the schema validator and the governance engine
//! build it the same way. Serialized field names follow the wire shape used by
//! the front-end (`humanReview`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Request
// ============================================================================

/// Document format that successfully parsed the submitted spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecFormat {
    /// JSON document.
    #[serde(rename = "JSON")]
    Json,
    /// YAML document.
    #[serde(rename = "YAML")]
    Yaml,
}

impl SpecFormat {
    /// Returns the stable, upper-case label for the format.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

impl fmt::Display for SpecFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input to every validator.
///
/// # Invariants
/// - The parsed spec is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestModel {
    /// Parser that produced the spec.
    format: SpecFormat,
    /// Parsed API specification tree.
    spec: Value,
}

impl RequestModel {
    /// Creates a request from an already parsed spec.
    #[must_use]
    pub const fn new(format: SpecFormat, spec: Value) -> Self {
        Self {
            format,
            spec,
        }
    }

    /// Returns the detected document format.
    #[must_use]
    pub const fn format(&self) -> SpecFormat {
        self.format
    }

    /// Returns the parsed spec.
    #[must_use]
    pub const fn spec(&self) -> &Value {
        &self.spec
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// One evaluated rule outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSectionRule {
    /// Rule text copied from the rule definition.
    pub rule: String,
    /// Whether the rule requires human review.
    pub human_review: bool,
    /// Finding, disclaimer, or error notice for the rule.
    pub recommendation: String,
}

/// Ordered group of rule outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    /// Section identifier (dotted numbering, e.g. `1.0`).
    pub id: String,
    /// Section display name.
    pub name: String,
    /// Rule outcomes in declaration order.
    pub rules: Vec<ReportSectionRule>,
}

/// Top-level validation artifact.
///
/// # Invariants
/// - Section and rule order equals the order of the source definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Display name of the standard the report was produced against.
    pub name: String,
    /// Sections in declaration order.
    pub sections: Vec<ReportSection>,
}

impl Report {
    /// Returns the total number of rule outcomes across all sections.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.sections.iter().map(|section| section.rules.len()).sum()
    }

    /// Iterates rule outcomes in report order, paired with their section.
    pub fn rules(&self) -> impl Iterator<Item = (&ReportSection, &ReportSectionRule)> {
        self.sections.iter().flat_map(|section| section.rules.iter().map(move |rule| (section, rule)))
    }

    /// Returns true when every rule carries a non-empty recommendation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.rules().all(|(_, rule)| !rule.recommendation.trim().is_empty())
    }
}

// ============================================================================
// SECTION: Response
// ============================================================================

/// Validator output: the report plus validator-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseModel {
    /// Completed report.
    pub report: Report,
    /// Failures that are not per-rule findings, in occurrence order.
    pub errors: Vec<String>,
}

impl ResponseModel {
    /// Creates a response with no validator-level failures.
    #[must_use]
    pub const fn clean(report: Report) -> Self {
        Self {
            report,
            errors: Vec::new(),
        }
    }

    /// Returns true when no validator-level failures were recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
