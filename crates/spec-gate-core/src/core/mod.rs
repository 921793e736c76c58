// crates/spec-gate-core/src/core/mod.rs
// ============================================================================
// Module: Spec Gate Core Types
// Description: Report model, spec loader, and governance catalogue.
// Purpose: Provide stable, serializable types shared by all validators.
// Dependencies: serde, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for what a validator consumes
//! ([`RequestModel`], [`GovernanceCatalogue`]) and what it produces
//! ([`ResponseModel`]). Renderers and transports only ever see these types.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalogue;
pub mod loader;
pub mod model;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalogue::CatalogueError;
pub use catalogue::GovernanceCatalogue;
pub use catalogue::GovernanceSection;
pub use catalogue::RuleDefinition;
pub use loader::MAX_SPEC_BYTES;
pub use loader::SpecLoadError;
pub use loader::load_spec;
pub use loader::load_spec_file;
pub use loader::parse_document;
pub use model::Report;
pub use model::ReportSection;
pub use model::ReportSectionRule;
pub use model::RequestModel;
pub use model::ResponseModel;
pub use model::SpecFormat;
