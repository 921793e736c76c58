// crates/spec-gate-core/src/core/catalogue.rs
// ============================================================================
// Module: Governance Catalogue
// Description: Typed loading of the declarative governance rule catalogue.
// Purpose: Reject malformed catalogues at load time instead of at evaluation.
// Dependencies: serde, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! A governance catalogue is a named standard made of ordered sections, each
//! holding ordered rules. Every rule declares up front whether it needs human
//! review. Field names are load-bearing: unknown fields are rejected, missing
//! fields are errors, and ordering is preserved exactly as authored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::loader::SpecLoadError;
use crate::core::loader::parse_document;
use crate::core::loader::read_limited;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Catalogue bundled with the crate.
const BUILTIN_CATALOGUE: &str = include_str!("../../assets/api_standards_and_governance.yaml");

// ============================================================================
// SECTION: Types
// ============================================================================

/// One governance rule as authored in the catalogue.
///
/// # Invariants
/// - `requires_human_review` is fixed by the author and never computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Natural-language statement of the rule.
    #[serde(rename = "rule")]
    pub text: String,
    /// True when the rule can only be judged by a person.
    #[serde(rename = "humanReview")]
    pub requires_human_review: bool,
}

/// Ordered group of rules within a catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceSection {
    /// Section identifier (dotted numbering, e.g. `1.0`).
    #[serde(deserialize_with = "deserialize_section_id")]
    pub id: String,
    /// Section display name.
    pub name: String,
    /// Rules in declaration order.
    pub rules: Vec<RuleDefinition>,
}

/// Governance standard: named sections of ordered rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceCatalogue {
    /// Display name of the standard.
    pub name: String,
    /// Sections in declaration order.
    pub sections: Vec<GovernanceSection>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalogue loading failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum CatalogueError {
    /// The catalogue document could not be read or parsed.
    #[error("catalogue document error: {0}")]
    Document(#[from] SpecLoadError),
    /// The document does not have the catalogue shape.
    #[error("catalogue structure error: {0}")]
    Structure(String),
    /// The catalogue parsed but violates a content rule.
    #[error("invalid catalogue: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl GovernanceCatalogue {
    /// Loads a catalogue file (JSON or YAML).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] when the file is unreadable, malformed, or invalid.
    pub fn load(path: &Path) -> Result<Self, CatalogueError> {
        let bytes = read_limited(path)?;
        Self::from_slice(&bytes)
    }

    /// Parses a catalogue from raw JSON or YAML bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] when the bytes are malformed or invalid.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogueError> {
        let (_, value) = parse_document(bytes)?;
        Self::from_value(value)
    }

    /// Builds a catalogue from an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] when required fields are missing or invalid.
    pub fn from_value(value: Value) -> Result<Self, CatalogueError> {
        let catalogue: Self =
            serde_json::from_value(value).map_err(|err| CatalogueError::Structure(err.to_string()))?;
        catalogue.validate()?;
        Ok(catalogue)
    }

    /// Returns the catalogue bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError`] if the bundled document is invalid.
    pub fn builtin() -> Result<Self, CatalogueError> {
        Self::from_slice(BUILTIN_CATALOGUE.as_bytes())
    }

    /// Validates catalogue content beyond its shape.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), CatalogueError> {
        if self.name.trim().is_empty() {
            return Err(CatalogueError::Invalid("name must be non-empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for (section_index, section) in self.sections.iter().enumerate() {
            if section.id.trim().is_empty() {
                return Err(CatalogueError::Invalid(format!(
                    "sections[{section_index}].id must be non-empty"
                )));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(CatalogueError::Invalid(format!(
                    "sections[{section_index}].id duplicates section {}",
                    section.id
                )));
            }
            if section.name.trim().is_empty() {
                return Err(CatalogueError::Invalid(format!(
                    "sections[{section_index}].name must be non-empty"
                )));
            }
            for (rule_index, rule) in section.rules.iter().enumerate() {
                if rule.text.trim().is_empty() {
                    return Err(CatalogueError::Invalid(format!(
                        "sections[{section_index}].rules[{rule_index}].rule must be non-empty"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the total number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.sections.iter().map(|section| section.rules.len()).sum()
    }

    /// Returns the number of rules that can be checked without a person.
    #[must_use]
    pub fn automated_rule_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|section| &section.rules)
            .filter(|rule| !rule.requires_human_review)
            .count()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Accepts section identifiers written as strings or bare numbers (`1.0`).
fn deserialize_section_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "section id must be a string or number, got {}",
            json_kind(&other)
        ))),
    }
}

/// Returns a short label for a JSON value kind.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
