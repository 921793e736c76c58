// crates/spec-gate-cli/src/lib.rs
// ============================================================================
// Module: Spec Gate CLI Library
// Description: Shared helpers for the Spec Gate command-line interface.
// Purpose: Provide report rendering for the CLI binary and tests.
// Dependencies: serde_json, spec-gate-core
// ============================================================================

//! ## Overview
//! This library houses the report renderers used by the `spec-gate` binary
//! (`src/main.rs`), so output formatting can be tested without spawning a
//! process.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Markdown and JSON report rendering.
pub mod render;
