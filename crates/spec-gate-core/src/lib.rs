// crates/spec-gate-core/src/lib.rs
// ============================================================================
// Module: Spec Gate Core Library
// Description: Public API surface for the Spec Gate core.
// Purpose: Expose report types, spec loading, catalogues, and interfaces.
// Dependencies: crate::{core, interfaces, audit}
// ============================================================================

//! ## Overview
//! Spec Gate core defines the report model shared by every validator, the
//! loader that turns uploaded bytes into a [`RequestModel`], the governance
//! catalogue consumed by the rule engine, and the interfaces used to reach
//! text-generation backends and audit pipelines. Validators live in sibling
//! crates and only exchange the types defined here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::BackendCallEvent;
pub use audit::BackendCallEventParams;
pub use audit::CallOutcome;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::RunOutcome;
pub use audit::StderrAuditSink;
pub use audit::ValidationAuditSink;
pub use audit::ValidationRunEvent;
pub use audit::ValidationRunEventParams;
pub use audit::ValidatorKind;
pub use core::*;
pub use interfaces::GenerationError;
pub use interfaces::GenerationRequest;
pub use interfaces::TextGenerator;
