// crates/spec-gate-governance/src/engine.rs
// ============================================================================
// Module: Governance Engine
// Description: Concurrent, order-preserving evaluation of a rule catalogue.
// Purpose: Turn a catalogue and a spec into the governance report.
// Dependencies: spec-gate-core, tokio
// ============================================================================

//! ## Overview
//! The engine flattens the catalogue into one query per rule. Human-review
//! rules are answered locally with a fixed disclaimer; every other rule is
//! dispatched to the [`TextGenerator`] on its own task. Tasks run
//! concurrently under a semaphore bound and report back with the index of
//! the query they answer, so the assembled report always follows catalogue
//! order regardless of completion order.
//!
//! Backend failures degrade per rule: the affected rule receives a
//! "could not be evaluated" recommendation and the failure is listed in
//! [`ResponseModel::errors`]. Cancellation, the run timeout, and a crashed
//! worker task fail the whole run instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use spec_gate_core::BackendCallEvent;
use spec_gate_core::BackendCallEventParams;
use spec_gate_core::CallOutcome;
use spec_gate_core::GenerationError;
use spec_gate_core::GenerationRequest;
use spec_gate_core::GovernanceCatalogue;
use spec_gate_core::NoopAuditSink;
use spec_gate_core::Report;
use spec_gate_core::ReportSection;
use spec_gate_core::ReportSectionRule;
use spec_gate_core::ResponseModel;
use spec_gate_core::RunOutcome;
use spec_gate_core::TextGenerator;
use spec_gate_core::ValidationAuditSink;
use spec_gate_core::ValidationRunEvent;
use spec_gate_core::ValidationRunEventParams;
use spec_gate_core::ValidatorKind;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::prompt::SYSTEM_PROMPT;
use crate::prompt::normalize_recommendation;
use crate::prompt::render_user_prompt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Recommendation for rules that only a person can assess.
pub const HUMAN_REVIEW_MESSAGE: &str =
    "This guideline requires human review and cannot be validated by software.";
/// Prefix of the recommendation recorded for a rule whose backend call failed.
pub const UNEVALUATED_PREFIX: &str = "This guideline could not be evaluated";
/// Default number of backend calls allowed in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
/// Upper bound on concurrent backend calls.
pub const MAX_CONCURRENCY_LIMIT: usize = 64;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Governance engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum backend calls in flight for one run.
    pub max_concurrency: usize,
    /// Sampling temperature passed to the backend.
    pub temperature: f32,
    /// Optional wall-clock budget for a whole run.
    pub run_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            temperature: DEFAULT_TEMPERATURE,
            run_timeout: None,
        }
    }
}

impl EngineConfig {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidConfig`] when a setting is out of range.
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if !(1 ..= MAX_CONCURRENCY_LIMIT).contains(&self.max_concurrency) {
            return Err(GovernanceError::InvalidConfig(format!(
                "max_concurrency must be between 1 and {MAX_CONCURRENCY_LIMIT}"
            )));
        }
        if !self.temperature.is_finite() || !(0.0 ..= 2.0).contains(&self.temperature) {
            return Err(GovernanceError::InvalidConfig(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.run_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(GovernanceError::InvalidConfig(
                "run_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Run-level governance failures.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// Engine or backend settings are invalid.
    #[error("invalid governance configuration: {0}")]
    InvalidConfig(String),
    /// The spec could not be serialized into a prompt.
    #[error("failed to serialize spec: {0}")]
    Serialize(String),
    /// The caller cancelled the run.
    #[error("governance run cancelled")]
    Cancelled,
    /// The run exceeded its time budget.
    #[error("governance run timed out")]
    TimedOut,
    /// A worker task panicked or was lost.
    #[error("governance worker failed: {0}")]
    Worker(String),
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// One rule flattened out of the catalogue.
struct RuleQuery {
    /// Owning section identifier.
    section_id: String,
    /// Owning section name, presented to the backend as the standard name.
    section_name: String,
    /// Position of the rule inside its section.
    rule_index: usize,
    /// Rule text.
    rule: String,
    /// Whether the rule is answered locally.
    human_review: bool,
}

/// Result of one worker task, tagged with the query it answers.
struct TaskOutput {
    /// Index into the flattened query list.
    index: usize,
    /// Normalized recommendation or the backend failure.
    result: Result<String, GenerationError>,
}

/// Flattens a catalogue in declaration order.
fn flatten(catalogue: &GovernanceCatalogue) -> Vec<RuleQuery> {
    catalogue
        .sections
        .iter()
        .flat_map(|section| {
            section.rules.iter().enumerate().map(|(rule_index, rule)| RuleQuery {
                section_id: section.id.clone(),
                section_name: section.name.clone(),
                rule_index,
                rule: rule.text.clone(),
                human_review: rule.requires_human_review,
            })
        })
        .collect()
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Catalogue-driven governance validator.
///
/// # Invariants
/// - Report order equals catalogue order.
/// - Human-review rules never reach the backend.
/// - Every rule in a returned report has a non-empty recommendation.
pub struct GovernanceEngine {
    /// Backend used for automated rules.
    generator: Arc<dyn TextGenerator>,
    /// Validated engine settings.
    config: EngineConfig,
    /// Audit sink for run and backend call events.
    audit: Arc<dyn ValidationAuditSink>,
}

impl GovernanceEngine {
    /// Creates an engine over a text-generation backend.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::InvalidConfig`] when `config` is out of range.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        config: EngineConfig,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        Ok(Self {
            generator,
            config,
            audit: Arc::new(NoopAuditSink),
        })
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn ValidationAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the engine settings.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates every catalogue rule against the spec.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError`] when the run times out, a worker crashes,
    /// or the spec cannot be serialized. Individual backend failures do not
    /// fail the run.
    pub async fn validate(
        &self,
        spec: &Value,
        catalogue: &GovernanceCatalogue,
    ) -> Result<ResponseModel, GovernanceError> {
        self.validate_until(spec, catalogue, pending::<()>()).await
    }

    /// Evaluates the catalogue, aborting when `cancel` resolves first.
    ///
    /// # Errors
    ///
    /// Returns [`GovernanceError::Cancelled`] when `cancel` resolves before
    /// all rules are answered, plus every failure listed on [`Self::validate`].
    pub async fn validate_until<F>(
        &self,
        spec: &Value,
        catalogue: &GovernanceCatalogue,
        cancel: F,
    ) -> Result<ResponseModel, GovernanceError>
    where
        F: Future<Output = ()> + Send,
    {
        let started = Instant::now();
        let queries = flatten(catalogue);
        let spec_text: Arc<str> = serde_json::to_string_pretty(spec)
            .map_err(|err| GovernanceError::Serialize(err.to_string()))?
            .into();

        let mut results: Vec<Option<Result<String, GenerationError>>> =
            queries.iter().map(|_| None).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        for (index, query) in queries.iter().enumerate() {
            if query.human_review {
                if let Some(slot) = results.get_mut(index) {
                    *slot = Some(Ok(HUMAN_REVIEW_MESSAGE.to_string()));
                }
                continue;
            }
            let job = RuleJob {
                index,
                section_id: query.section_id.clone(),
                section_name: query.section_name.clone(),
                rule: query.rule.clone(),
                rule_position: query.rule_index + 1,
                spec_text: Arc::clone(&spec_text),
                temperature: self.config.temperature,
            };
            tasks.spawn(evaluate(
                job,
                Arc::clone(&self.generator),
                Arc::clone(&self.audit),
                Arc::clone(&semaphore),
            ));
        }

        let run_timeout = self.config.run_timeout;
        let deadline = async move {
            match run_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => pending::<()>().await,
            }
        };
        let gathered = tokio::select! {
            gathered = gather(&mut tasks, &mut results) => gathered,
            () = cancel => Err(GovernanceError::Cancelled),
            () = deadline => Err(GovernanceError::TimedOut),
        };
        if let Err(err) = gathered {
            tasks.abort_all();
            self.record_run(catalogue, queries.len(), 0, RunOutcome::Failed, started);
            return Err(err);
        }

        let (response, failed) = assemble(catalogue, &queries, results)?;
        let outcome = if failed == 0 { RunOutcome::Completed } else { RunOutcome::Degraded };
        self.record_run(catalogue, queries.len(), failed, outcome, started);
        Ok(response)
    }

    /// Records the run-level audit event.
    fn record_run(
        &self,
        catalogue: &GovernanceCatalogue,
        rules: usize,
        failed_rules: usize,
        outcome: RunOutcome,
        started: Instant,
    ) {
        self.audit.record_run(&ValidationRunEvent::new(ValidationRunEventParams {
            validator: ValidatorKind::Governance,
            report_name: catalogue.name.clone(),
            sections: catalogue.sections.len(),
            rules,
            failed_rules,
            outcome,
            duration_ms: started.elapsed().as_millis(),
        }));
    }
}

// ============================================================================
// SECTION: Rule Tasks
// ============================================================================

/// Work item for one automated rule.
///
/// Holds the serialized spec by reference; the prompt is rendered only once
/// a concurrency permit is held.
struct RuleJob {
    /// Index into the flattened query list.
    index: usize,
    /// Owning section identifier.
    section_id: String,
    /// Owning section name.
    section_name: String,
    /// Rule text.
    rule: String,
    /// One-based rule position within its section.
    rule_position: usize,
    /// Pretty-printed spec shared by every job of the run.
    spec_text: Arc<str>,
    /// Sampling temperature.
    temperature: f32,
}

/// Waits for a permit, then asks the backend about one rule.
async fn evaluate(
    job: RuleJob,
    generator: Arc<dyn TextGenerator>,
    audit: Arc<dyn ValidationAuditSink>,
    semaphore: Arc<Semaphore>,
) -> TaskOutput {
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return TaskOutput {
            index: job.index,
            result: Err(GenerationError::Unavailable("concurrency limiter closed".to_string())),
        };
    };
    let request = GenerationRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt: render_user_prompt(&job.spec_text, &job.section_name, &job.rule),
        temperature: job.temperature,
    };
    let call_started = Instant::now();
    let result =
        generator.generate(&request).await.and_then(|text| normalize_recommendation(&text));
    audit.record_backend_call(&BackendCallEvent::new(BackendCallEventParams {
        section_id: job.section_id,
        rule_position: job.rule_position,
        outcome: if result.is_ok() { CallOutcome::Ok } else { CallOutcome::Error },
        latency_ms: call_started.elapsed().as_millis(),
        error_kind: result.as_ref().err().map(GenerationError::kind),
    }));
    TaskOutput {
        index: job.index,
        result,
    }
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Drains the task set, storing each output in its query slot.
async fn gather(
    tasks: &mut JoinSet<TaskOutput>,
    results: &mut [Option<Result<String, GenerationError>>],
) -> Result<(), GovernanceError> {
    while let Some(joined) = tasks.join_next().await {
        let output = joined.map_err(|err| GovernanceError::Worker(err.to_string()))?;
        let slot = results.get_mut(output.index).ok_or_else(|| {
            GovernanceError::Worker(format!("result index {} out of range", output.index))
        })?;
        *slot = Some(output.result);
    }
    Ok(())
}

/// Builds the report and error list in catalogue order.
///
/// Returns the response together with the number of failed rules.
fn assemble(
    catalogue: &GovernanceCatalogue,
    queries: &[RuleQuery],
    results: Vec<Option<Result<String, GenerationError>>>,
) -> Result<(ResponseModel, usize), GovernanceError> {
    let mut answers = results.into_iter();
    let mut errors = Vec::new();
    let mut sections = Vec::with_capacity(catalogue.sections.len());
    for section in &catalogue.sections {
        let mut rules = Vec::with_capacity(section.rules.len());
        for (rule_index, rule) in section.rules.iter().enumerate() {
            let answer = answers.next().flatten().ok_or_else(|| {
                GovernanceError::Worker(format!(
                    "no result for section {} rule {}",
                    section.id,
                    rule_index + 1
                ))
            })?;
            let recommendation = match answer {
                Ok(text) => text,
                Err(err) => {
                    errors.push(format!(
                        "section {} rule {}: {err}",
                        section.id,
                        rule_index + 1
                    ));
                    format!("{UNEVALUATED_PREFIX}: {err}")
                }
            };
            rules.push(ReportSectionRule {
                rule: rule.text.clone(),
                human_review: rule.requires_human_review,
                recommendation,
            });
        }
        sections.push(ReportSection {
            id: section.id.clone(),
            name: section.name.clone(),
            rules,
        });
    }
    let failed = errors.len();
    if failed > 0 {
        let automated = queries.iter().filter(|query| !query.human_review).count();
        errors.push(format!("{failed} of {automated} automated guidelines could not be evaluated."));
    }
    let response = ResponseModel {
        report: Report {
            name: catalogue.name.clone(),
            sections,
        },
        errors,
    };
    Ok((response, failed))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
