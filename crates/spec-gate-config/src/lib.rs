// crates/spec-gate-config/src/lib.rs
// ============================================================================
// Module: Spec Gate Config Library
// Description: Configuration model and validation for spec-gate.toml.
// Purpose: Single source of truth for backend, engine, and audit settings.
// Dependencies: serde, toml, spec-gate-governance
// ============================================================================

//! ## Overview
//! `spec-gate-config` loads `spec-gate.toml`, validates every field against
//! hard limits, and converts the result into the settings consumed by the
//! governance engine, the chat completions backend, and the audit sinks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
