// crates/spec-gate-cli/src/render.rs
// ============================================================================
// Module: Report Rendering
// Description: Markdown and JSON renderings of validation responses.
// Purpose: Walk the report tree once for every output format.
// Dependencies: serde_json, spec-gate-core
// ============================================================================

//! ## Overview
//! Markdown output uses one `#` heading per report, `###` per section, and
//! `####` per rule, followed by the recommendation. Rules that need a person
//! carry a `_human review_` marker. Validator errors, when present, follow the
//! report under an `## Errors` heading.

use std::fmt::Write as _;

use spec_gate_core::ResponseModel;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders responses as one Markdown document.
#[must_use]
pub fn render_markdown(responses: &[ResponseModel]) -> String {
    let mut out = String::new();
    for (index, response) in responses.iter().enumerate() {
        if index > 0 {
            out.push_str("\n---\n\n");
        }
        let report = &response.report;
        let _ = writeln!(out, "# {}\n", report.name);
        for section in &report.sections {
            let _ = writeln!(out, "### {} {}\n", section.id, section.name);
            for rule in &section.rules {
                let _ = writeln!(out, "#### {}\n", rule.rule);
                if rule.human_review {
                    out.push_str("_human review_\n\n");
                }
                let _ = writeln!(out, "{}\n", rule.recommendation);
            }
        }
        if !response.errors.is_empty() {
            out.push_str("## Errors\n\n");
            for error in &response.errors {
                let _ = writeln!(out, "- {error}");
            }
            out.push('\n');
        }
    }
    out
}

/// Renders responses as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if serialization fails.
pub fn render_json(responses: &[ResponseModel]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(responses)
}

/// Returns true when every response is complete and carries no errors.
#[must_use]
pub fn all_clean(responses: &[ResponseModel]) -> bool {
    responses.iter().all(|response| response.is_clean() && response.report.is_complete())
}
