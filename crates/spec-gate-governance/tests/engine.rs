// crates/spec-gate-governance/tests/engine.rs
// ============================================================================
// Module: Governance Engine Tests
// Description: Ordering, short-circuit, degrade, and cancellation behavior.
// ============================================================================
//! ## Overview
//! Drives [`GovernanceEngine`] with a scripted in-process generator so call
//! counts, completion order, and failures are fully controlled.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use spec_gate_core::BackendCallEvent;
use spec_gate_core::CallOutcome;
use spec_gate_core::GenerationError;
use spec_gate_core::GenerationRequest;
use spec_gate_core::GovernanceCatalogue;
use spec_gate_core::RunOutcome;
use spec_gate_core::TextGenerator;
use spec_gate_core::ValidationAuditSink;
use spec_gate_core::ValidationRunEvent;
use spec_gate_governance::EngineConfig;
use spec_gate_governance::GovernanceEngine;
use spec_gate_governance::GovernanceError;
use spec_gate_governance::HUMAN_REVIEW_MESSAGE;
use spec_gate_governance::UNEVALUATED_PREFIX;

// ============================================================================
// SECTION: Scripted Generator
// ============================================================================

/// Scripted reply for one rule.
#[derive(Clone)]
enum Script {
    /// Reply with text after a delay.
    Reply(Duration, &'static str),
    /// Reply with exactly this text.
    Verbatim(&'static str),
    /// Fail with a backend status.
    Fail(u16),
    /// Never answer within test time.
    Hang,
    /// Panic inside the worker.
    Crash,
}

/// Generator that answers by matching rule text found in the prompt.
struct ScriptedGenerator {
    scripts: HashMap<&'static str, Script>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    prompts: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn new(scripts: &[(&'static str, Script)]) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts.iter().cloned().collect(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.clone());
        let (rule, script) = self
            .scripts
            .iter()
            .find(|(rule, _)| request.user_prompt.contains(&format!(":\n{rule}\n")))
            .map(|(rule, script)| (*rule, script.clone()))
            .unwrap_or_else(|| panic!("unscripted prompt: {}", request.user_prompt));
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let result = match script {
            Script::Reply(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(format!("{text} ({rule})"))
            }
            Script::Verbatim(text) => Ok(text.to_string()),
            Script::Fail(status) => Err(GenerationError::Status {
                status,
                message: "Service Unavailable".to_string(),
            }),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("late".to_string())
            }
            Script::Crash => panic!("generator crashed"),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Audit sink that keeps every event.
#[derive(Default)]
struct RecordingSink {
    runs: Mutex<Vec<ValidationRunEvent>>,
    calls: Mutex<Vec<BackendCallEvent>>,
}

impl ValidationAuditSink for RecordingSink {
    fn record_run(&self, event: &ValidationRunEvent) {
        self.runs.lock().unwrap().push(event.clone());
    }

    fn record_backend_call(&self, event: &BackendCallEvent) {
        self.calls.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn spec() -> Value {
    json!({"openapi": "3.0.1", "info": {"title": "Pets", "version": "1"}, "paths": {}})
}

/// Two sections: three automated rules and one human-review rule.
fn catalogue() -> GovernanceCatalogue {
    GovernanceCatalogue::from_value(json!({
        "name": "Test Standard",
        "sections": [
            {"id": "1.0", "name": "Design", "rules": [
                {"rule": "Alpha rule.", "humanReview": false},
                {"rule": "Bravo rule.", "humanReview": false}
            ]},
            {"id": "2.0", "name": "Security", "rules": [
                {"rule": "Charlie rule.", "humanReview": false},
                {"rule": "Delta rule.", "humanReview": true}
            ]}
        ]
    }))
    .unwrap()
}

fn engine(generator: Arc<ScriptedGenerator>, config: EngineConfig) -> GovernanceEngine {
    GovernanceEngine::new(generator, config).unwrap()
}

fn recommendations(response: &spec_gate_core::ResponseModel) -> Vec<String> {
    response.report.rules().map(|(_, rule)| rule.recommendation.clone()).collect()
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn report_follows_catalogue_order_not_completion_order() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Reply(Duration::from_millis(120), "first")),
        ("Bravo rule.", Script::Reply(Duration::from_millis(60), "second")),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "third")),
    ]);
    let response = engine(Arc::clone(&generator), EngineConfig::default())
        .validate(&spec(), &catalogue())
        .await
        .unwrap();

    assert!(response.errors.is_empty());
    assert_eq!(response.report.name, "Test Standard");
    let ids: Vec<&str> = response.report.sections.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1.0", "2.0"]);
    assert_eq!(
        recommendations(&response),
        vec![
            "first (Alpha rule.)".to_string(),
            "second (Bravo rule.)".to_string(),
            "third (Charlie rule.)".to_string(),
            HUMAN_REVIEW_MESSAGE.to_string(),
        ]
    );
    let rules: Vec<&str> = response.report.rules().map(|(_, rule)| rule.rule.as_str()).collect();
    assert_eq!(rules, vec!["Alpha rule.", "Bravo rule.", "Charlie rule.", "Delta rule."]);
    assert!(response.report.is_complete());
}

#[tokio::test]
async fn human_review_rules_never_reach_backend() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Bravo rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "ok")),
    ]);
    let response = engine(Arc::clone(&generator), EngineConfig::default())
        .validate(&spec(), &catalogue())
        .await
        .unwrap();

    assert_eq!(generator.calls(), 3);
    let (_, delta) = response.report.rules().nth(3).unwrap();
    assert!(delta.human_review);
    assert_eq!(delta.recommendation, HUMAN_REVIEW_MESSAGE);
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts.iter().all(|prompt| !prompt.user_prompt.contains("Delta rule.")));
}

#[tokio::test]
async fn all_human_review_catalogue_makes_no_calls() {
    let generator = ScriptedGenerator::new(&[]);
    let catalogue = GovernanceCatalogue::from_value(json!({
        "name": "Manual",
        "sections": [{"id": "1.0", "name": "Lifecycle", "rules": [
            {"rule": "Owner assigned.", "humanReview": true},
            {"rule": "Deprecation plan.", "humanReview": true}
        ]}]
    }))
    .unwrap();
    let response = engine(Arc::clone(&generator), EngineConfig::default())
        .validate(&spec(), &catalogue)
        .await
        .unwrap();
    assert_eq!(generator.calls(), 0);
    assert!(response.is_clean());
    assert!(response.report.rules().all(|(_, rule)| rule.recommendation == HUMAN_REVIEW_MESSAGE));
}

// ============================================================================
// SECTION: Prompts
// ============================================================================

#[tokio::test]
async fn prompt_carries_spec_section_name_and_temperature() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Bravo rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "ok")),
    ]);
    let config = EngineConfig {
        temperature: 0.0,
        ..EngineConfig::default()
    };
    engine(Arc::clone(&generator), config).validate(&spec(), &catalogue()).await.unwrap();

    let prompts = generator.prompts.lock().unwrap();
    let charlie = prompts.iter().find(|p| p.user_prompt.contains("Charlie rule.")).unwrap();
    assert!(charlie.user_prompt.contains("\"openapi\": \"3.0.1\""));
    assert!(charlie.user_prompt.contains("API standard \"Security\""));
    assert!(!charlie.system_prompt.is_empty());
    assert!(prompts.iter().all(|p| p.temperature == 0.0));
}

// ============================================================================
// SECTION: Failure Policy
// ============================================================================

#[tokio::test]
async fn failed_call_degrades_only_its_rule() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Reply(Duration::from_millis(10), "ok")),
        ("Bravo rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Charlie rule.", Script::Fail(503)),
    ]);
    let response = engine(generator, EngineConfig::default())
        .validate(&spec(), &catalogue())
        .await
        .unwrap();

    let recs = recommendations(&response);
    assert_eq!(recs[0], "ok (Alpha rule.)");
    assert_eq!(recs[1], "ok (Bravo rule.)");
    assert!(recs[2].starts_with(UNEVALUATED_PREFIX), "{}", recs[2]);
    assert!(recs[2].contains("503"));
    assert_eq!(recs[3], HUMAN_REVIEW_MESSAGE);
    assert!(response.report.is_complete());

    assert_eq!(response.errors.len(), 2);
    assert!(response.errors[0].starts_with("section 2.0 rule 1:"), "{}", response.errors[0]);
    assert_eq!(response.errors[1], "1 of 3 automated guidelines could not be evaluated.");
}

#[tokio::test]
async fn empty_generation_counts_as_failure() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Verbatim("  \n")),
        ("Bravo rule.", Script::Verbatim("```html\n<p>Add tags.</p>\n```")),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "ok")),
    ]);
    let response = engine(generator, EngineConfig::default())
        .validate(&spec(), &catalogue())
        .await
        .unwrap();

    let recs = recommendations(&response);
    assert!(recs[0].starts_with(UNEVALUATED_PREFIX), "{}", recs[0]);
    assert_eq!(recs[1], "<p>Add tags.</p>");
    assert!(response.errors[0].starts_with("section 1.0 rule 1:"));
    assert_eq!(response.errors.last().unwrap(), "1 of 3 automated guidelines could not be evaluated.");
}

#[tokio::test]
async fn crashed_worker_fails_the_run() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Bravo rule.", Script::Crash),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "ok")),
    ]);
    let result = engine(generator, EngineConfig::default()).validate(&spec(), &catalogue()).await;
    assert!(matches!(result, Err(GovernanceError::Worker(_))));
}

// ============================================================================
// SECTION: Concurrency and Cancellation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_is_bounded_by_config() {
    let rules: Vec<Value> = (0 .. 6)
        .map(|index| json!({"rule": format!("Rule number {index}."), "humanReview": false}))
        .collect();
    let catalogue = GovernanceCatalogue::from_value(json!({
        "name": "Wide",
        "sections": [{"id": "1.0", "name": "All", "rules": rules}]
    }))
    .unwrap();
    let scripts: Vec<(&'static str, Script)> = [
        "Rule number 0.",
        "Rule number 1.",
        "Rule number 2.",
        "Rule number 3.",
        "Rule number 4.",
        "Rule number 5.",
    ]
    .into_iter()
    .map(|rule| (rule, Script::Reply(Duration::from_millis(25), "ok")))
    .collect();
    let generator = ScriptedGenerator::new(&scripts);
    let config = EngineConfig {
        max_concurrency: 2,
        ..EngineConfig::default()
    };
    let response =
        engine(Arc::clone(&generator), config).validate(&spec(), &catalogue).await.unwrap();

    assert_eq!(generator.calls(), 6);
    assert!(generator.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(recommendations(&response)[5], "ok (Rule number 5.)");
}

#[tokio::test]
async fn cancellation_aborts_in_flight_calls() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Hang),
        ("Bravo rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Charlie rule.", Script::Hang),
    ]);
    let sink = Arc::new(RecordingSink::default());
    let engine = engine(generator, EngineConfig::default()).with_audit_sink(sink.clone());
    let result = engine
        .validate_until(&spec(), &catalogue(), tokio::time::sleep(Duration::from_millis(30)))
        .await;

    assert!(matches!(result, Err(GovernanceError::Cancelled)));
    let runs = sink.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].outcome, RunOutcome::Failed);
}

#[tokio::test]
async fn run_timeout_fails_cleanly() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Hang),
        ("Bravo rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "ok")),
    ]);
    let config = EngineConfig {
        run_timeout: Some(Duration::from_millis(30)),
        ..EngineConfig::default()
    };
    let result = engine(generator, config).validate(&spec(), &catalogue()).await;
    assert!(matches!(result, Err(GovernanceError::TimedOut)));
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = EngineConfig {
        max_concurrency: 0,
        ..EngineConfig::default()
    };
    let result = GovernanceEngine::new(ScriptedGenerator::new(&[]), config);
    assert!(matches!(result, Err(GovernanceError::InvalidConfig(_))));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[tokio::test]
async fn audit_records_calls_and_degraded_run() {
    let generator = ScriptedGenerator::new(&[
        ("Alpha rule.", Script::Reply(Duration::ZERO, "ok")),
        ("Bravo rule.", Script::Fail(500)),
        ("Charlie rule.", Script::Reply(Duration::ZERO, "ok")),
    ]);
    let sink = Arc::new(RecordingSink::default());
    let response = engine(generator, EngineConfig::default())
        .with_audit_sink(sink.clone())
        .validate(&spec(), &catalogue())
        .await
        .unwrap();

    let calls = sink.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    let failed: Vec<&BackendCallEvent> =
        calls.iter().filter(|call| call.outcome == CallOutcome::Error).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].section_id, "1.0");
    assert_eq!(failed[0].rule_position, 2);
    assert!(response.errors[0].starts_with("section 1.0 rule 2: "), "{:?}", response.errors);
    assert_eq!(failed[0].error_kind, Some("status"));

    let runs = sink.runs.lock().unwrap();
    assert_eq!(runs[0].outcome, RunOutcome::Degraded);
    assert_eq!(runs[0].failed_rules, 1);
    assert_eq!(runs[0].rules, 4);
}
