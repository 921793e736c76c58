// crates/spec-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Spec Gate Interfaces
// Description: Backend-agnostic interface for text generation.
// Purpose: Define the contract the governance engine uses to reach a backend.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! The governance engine treats its text-generation backend as an opaque
//! capability: a prompt and a sampling temperature go in, text comes out.
//! Implementations must be safe to call concurrently from many tasks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Text Generation
// ============================================================================

/// One text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System message framing the assistant role.
    pub system_prompt: String,
    /// User message carrying the rule and the spec.
    pub user_prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Text-generation failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Backend could not be reached or the request did not complete.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Short description of the failure.
        message: String,
    },
    /// Backend answered with a body that could not be interpreted.
    #[error("malformed backend response: {0}")]
    Malformed(String),
    /// Backend produced no text.
    #[error("backend returned an empty response")]
    Empty,
}

impl GenerationError {
    /// Returns a stable label for audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Status {
                ..
            } => "status",
            Self::Malformed(_) => "malformed",
            Self::Empty => "empty",
        }
    }
}

/// Backend capable of producing natural-language recommendations.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for the request.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the backend fails or returns unusable output.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
