// crates/spec-gate-governance/src/prompt.rs
// ============================================================================
// Module: Governance Prompts
// Description: Prompt rendering and generated text normalization.
// Purpose: Keep backend instructions and output cleanup in one place.
// Dependencies: spec-gate-core
// ============================================================================

//! ## Overview
//! Each automated rule becomes one user prompt that embeds the spec, the
//! owning section name as the standard, and the rule text. Generated text is
//! trimmed and unwrapped from a surrounding code fence before it is stored as
//! a recommendation.

use spec_gate_core::GenerationError;

// ============================================================================
// SECTION: Prompts
// ============================================================================

/// System message sent with every automated rule.
pub const SYSTEM_PROMPT: &str =
    "You are an API governance reviewer. You assess OpenAPI specifications against API standards.";

/// Renders the user prompt for one rule.
#[must_use]
pub fn render_user_prompt(spec: &str, standard_name: &str, rule: &str) -> String {
    format!(
        "Given the following OpenAPI specification:\n\n{spec}\n\nPlease analyse this \
         specification against the following API standard \"{standard_name}\":\n{rule}\n\n\
         Provide specific recommendations for addressing the gaps found, cite all the relevant \
         information in the gap and be concise.\n\
         - Don't include a title.\n\
         - Don't include an overview.\n\
         - Don't include a conclusion.\n\
         - Don't include a recommendation if it is already compliant, think carefully and \
         step-by-step.\n\n\
         Output in HTML format and remove the enclosing ```html and ```"
    )
}

// ============================================================================
// SECTION: Normalization
// ============================================================================

/// Trims generated text and strips one enclosing code fence.
///
/// # Errors
///
/// Returns [`GenerationError::Empty`] when nothing remains.
pub fn normalize_recommendation(text: &str) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    let unfenced = strip_code_fence(trimmed).unwrap_or(trimmed).trim();
    if unfenced.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(unfenced.to_string())
}

/// Returns the fenced body when `text` is wrapped in a code fence.
fn strip_code_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix("```")?.strip_suffix("```")?;
    // Drop the info string (e.g. `html`) on the opening line.
    let (_, body) = body.split_once('\n')?;
    Some(body)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
