// crates/spec-gate-core/src/audit.rs
// ============================================================================
// Module: Validation Audit Logging
// Description: Structured audit events for validation runs and backend calls.
// Purpose: Emit JSON-line audit logs without a logging framework dependency.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Validators report what they did through a [`ValidationAuditSink`]. Events
//! carry counts, outcomes, and latencies only; spec content and generated
//! text are never recorded. Deployments pick a sink (stderr, file, or none)
//! from configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Validator that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Deterministic structural schema validator.
    Schema,
    /// Backend-assisted governance rule engine.
    Governance,
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every rule was resolved without backend failures.
    Completed,
    /// The report completed but some rules carry error notices.
    Degraded,
    /// The run aborted before a report was produced.
    Failed,
}

/// Outcome of a single backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Backend returned usable text.
    Ok,
    /// Backend call failed.
    Error,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Validation run audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRunEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Validator that ran.
    pub validator: ValidatorKind,
    /// Report name (standard name).
    pub report_name: String,
    /// Number of sections in the report.
    pub sections: usize,
    /// Number of rules in the report.
    pub rules: usize,
    /// Number of rules whose evaluation failed.
    pub failed_rules: usize,
    /// Run outcome.
    pub outcome: RunOutcome,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u128,
}

/// Inputs required to construct a validation run event.
pub struct ValidationRunEventParams {
    /// Validator that ran.
    pub validator: ValidatorKind,
    /// Report name (standard name).
    pub report_name: String,
    /// Number of sections in the report.
    pub sections: usize,
    /// Number of rules in the report.
    pub rules: usize,
    /// Number of rules whose evaluation failed.
    pub failed_rules: usize,
    /// Run outcome.
    pub outcome: RunOutcome,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u128,
}

/// Backend call audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct BackendCallEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Owning section identifier.
    pub section_id: String,
    /// One-based rule position within its section, as in report errors.
    pub rule_position: usize,
    /// Call outcome.
    pub outcome: CallOutcome,
    /// Call latency in milliseconds.
    pub latency_ms: u128,
    /// Normalized error kind label when the call failed.
    pub error_kind: Option<&'static str>,
}

/// Inputs required to construct a backend call event.
pub struct BackendCallEventParams {
    /// Owning section identifier.
    pub section_id: String,
    /// One-based rule position within its section, as in report errors.
    pub rule_position: usize,
    /// Call outcome.
    pub outcome: CallOutcome,
    /// Call latency in milliseconds.
    pub latency_ms: u128,
    /// Normalized error kind label when the call failed.
    pub error_kind: Option<&'static str>,
}

impl ValidationRunEvent {
    /// Creates a new run event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ValidationRunEventParams) -> Self {
        Self {
            event: "validation_run",
            timestamp_ms: now_millis(),
            validator: params.validator,
            report_name: params.report_name,
            sections: params.sections,
            rules: params.rules,
            failed_rules: params.failed_rules,
            outcome: params.outcome,
            duration_ms: params.duration_ms,
        }
    }
}

impl BackendCallEvent {
    /// Creates a new backend call event with a consistent timestamp.
    #[must_use]
    pub fn new(params: BackendCallEventParams) -> Self {
        Self {
            event: "backend_call",
            timestamp_ms: now_millis(),
            section_id: params.section_id,
            rule_position: params.rule_position,
            outcome: params.outcome,
            latency_ms: params.latency_ms,
            error_kind: params.error_kind,
        }
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for validation events.
pub trait ValidationAuditSink: Send + Sync {
    /// Record a validation run event.
    fn record_run(&self, event: &ValidationRunEvent);

    /// Record a backend call event.
    fn record_backend_call(&self, _event: &BackendCallEvent) {}
}

/// Audit sink that discards events.
pub struct NoopAuditSink;

impl ValidationAuditSink for NoopAuditSink {
    fn record_run(&self, _event: &ValidationRunEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ValidationAuditSink for StderrAuditSink {
    fn record_run(&self, event: &ValidationRunEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_backend_call(&self, event: &BackendCallEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Serializes and appends one event line.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ValidationAuditSink for FileAuditSink {
    fn record_run(&self, event: &ValidationRunEvent) {
        self.append(event);
    }

    fn record_backend_call(&self, event: &BackendCallEvent) {
        self.append(event);
    }
}
