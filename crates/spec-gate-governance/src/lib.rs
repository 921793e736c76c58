// crates/spec-gate-governance/src/lib.rs
// ============================================================================
// Module: Spec Gate Governance
// Description: Catalogue-driven governance review of API specs.
// Purpose: Evaluate narrative rules through a text-generation backend.
// Dependencies: spec-gate-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! [`GovernanceEngine`] evaluates a [`spec_gate_core::GovernanceCatalogue`]
//! against a spec. Automated rules are answered by a
//! [`spec_gate_core::TextGenerator`]; [`ChatCompletionsGenerator`] is the
//! HTTP implementation for OpenAI-compatible endpoints.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod engine;
pub mod prompt;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::ChatCompletionsConfig;
pub use backend::ChatCompletionsGenerator;
pub use engine::DEFAULT_MAX_CONCURRENCY;
pub use engine::DEFAULT_TEMPERATURE;
pub use engine::EngineConfig;
pub use engine::GovernanceEngine;
pub use engine::GovernanceError;
pub use engine::HUMAN_REVIEW_MESSAGE;
pub use engine::MAX_CONCURRENCY_LIMIT;
pub use engine::UNEVALUATED_PREFIX;
