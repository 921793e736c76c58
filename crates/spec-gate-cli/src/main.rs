// crates/spec-gate-cli/src/main.rs
// ============================================================================
// Module: Spec Gate CLI Entry Point
// Description: Command dispatcher for spec validation workflows.
// Purpose: Run the schema and governance validators from the command line.
// Dependencies: clap, spec-gate-config, spec-gate-core, spec-gate-governance,
//               spec-gate-schema, tokio
// ============================================================================

//! ## Overview
//! `spec-gate validate` loads a JSON or YAML spec, runs the requested
//! validators, and prints the reports as JSON or Markdown. Exit codes:
//! `0` when every report is complete with no validator errors, `1` when a
//! report carries errors or a catalogue check fails, `2` on fatal errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::pending;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use spec_gate_cli::render::all_clean;
use spec_gate_cli::render::render_json;
use spec_gate_cli::render::render_markdown;
use spec_gate_config::SpecGateConfig;
use spec_gate_core::GovernanceCatalogue;
use spec_gate_core::RequestModel;
use spec_gate_core::ResponseModel;
use spec_gate_core::ValidationAuditSink;
use spec_gate_core::load_spec_file;
use spec_gate_governance::ChatCompletionsGenerator;
use spec_gate_governance::GovernanceEngine;
use spec_gate_schema::ReferenceSchema;
use spec_gate_schema::SchemaValidator;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for a completed run whose reports carry errors.
const EXIT_NOT_CLEAN: u8 = 1;
/// Exit code for fatal errors.
const EXIT_FATAL: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "spec-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a spec against the OpenAPI schema and/or the governance catalogue.
    Validate(ValidateCommand),
    /// Governance catalogue utilities.
    Catalogue {
        /// Selected catalogue subcommand.
        #[command(subcommand)]
        command: CatalogueCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `validate` command.
#[derive(clap::Args, Debug)]
struct ValidateCommand {
    /// Spec document (JSON or YAML).
    #[arg(value_name = "SPEC")]
    spec: PathBuf,
    /// Validators to run.
    #[arg(long, value_enum, default_value_t = StandardArg::All)]
    standard: StandardArg,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    output: OutputFormat,
    /// Optional config file path (defaults to spec-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Governance catalogue path (overrides config).
    #[arg(long, value_name = "PATH")]
    catalogue: Option<PathBuf>,
    /// Reference schema path (overrides config).
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,
}

/// Catalogue subcommands.
#[derive(Subcommand, Debug)]
enum CatalogueCommand {
    /// Validate a catalogue document and summarize it.
    Check {
        /// Catalogue document (YAML or JSON).
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Check {
        /// Optional config file path (defaults to spec-gate.toml or env override).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

/// Validator selection.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum StandardArg {
    /// Structural OpenAPI schema validation only.
    Openapi,
    /// Governance catalogue review only.
    Governance,
    /// Both validators, schema first.
    All,
}

/// Output format selection.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// JSON array of responses.
    Json,
    /// Markdown document.
    Markdown,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal CLI error.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(command) => command_validate(command).await,
        Commands::Catalogue {
            command,
        } => command_catalogue(command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes the `validate` command.
async fn command_validate(command: ValidateCommand) -> CliResult<ExitCode> {
    let config = SpecGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let audit = config
        .audit
        .build_sink()
        .map_err(|err| CliError::new(format!("failed to open audit sink: {err}")))?;
    let request = load_spec_file(&command.spec).map_err(|err| {
        CliError::new(format!("failed to load spec {}: {err}", command.spec.display()))
    })?;

    let mut responses = Vec::new();
    if matches!(command.standard, StandardArg::Openapi | StandardArg::All) {
        let schema_path = command.schema.as_deref().or(config.schema.reference_schema_path.as_deref());
        responses.push(run_schema(&request, schema_path, Arc::clone(&audit))?);
    }
    if matches!(command.standard, StandardArg::Governance | StandardArg::All) {
        let catalogue_path =
            command.catalogue.as_deref().or(config.governance.catalogue_path.as_deref());
        responses.push(run_governance(&request, catalogue_path, &config, audit).await?);
    }

    let rendered = match command.output {
        OutputFormat::Json => render_json(&responses)
            .map_err(|err| CliError::new(format!("failed to serialize reports: {err}")))?,
        OutputFormat::Markdown => render_markdown(&responses),
    };
    write_stdout(&rendered)?;
    Ok(if all_clean(&responses) { ExitCode::SUCCESS } else { ExitCode::from(EXIT_NOT_CLEAN) })
}

/// Runs the schema validator.
fn run_schema(
    request: &RequestModel,
    schema_path: Option<&Path>,
    audit: Arc<dyn ValidationAuditSink>,
) -> CliResult<ResponseModel> {
    let reference = match schema_path {
        Some(path) => ReferenceSchema::load(path),
        None => ReferenceSchema::builtin(),
    }
    .map_err(|err| CliError::new(format!("failed to load reference schema: {err}")))?;
    Ok(SchemaValidator::new(Arc::new(reference)).with_audit_sink(audit).validate(request))
}

/// Runs the governance engine, cancelling on Ctrl-C.
async fn run_governance(
    request: &RequestModel,
    catalogue_path: Option<&Path>,
    config: &SpecGateConfig,
    audit: Arc<dyn ValidationAuditSink>,
) -> CliResult<ResponseModel> {
    let catalogue = load_catalogue(catalogue_path)?;
    let api_key = config.backend.resolve_api_key();
    let generator =
        ChatCompletionsGenerator::new(config.backend.chat_completions_config(api_key))
            .map_err(|err| CliError::new(format!("failed to configure backend: {err}")))?;
    let engine = GovernanceEngine::new(Arc::new(generator), config.engine_config())
        .map_err(|err| CliError::new(format!("failed to configure governance engine: {err}")))?
        .with_audit_sink(audit);
    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            pending::<()>().await;
        }
    };
    engine
        .validate_until(request.spec(), &catalogue, interrupted)
        .await
        .map_err(|err| CliError::new(format!("governance validation failed: {err}")))
}

/// Loads a catalogue from disk or falls back to the bundled one.
fn load_catalogue(path: Option<&Path>) -> CliResult<GovernanceCatalogue> {
    match path {
        Some(path) => GovernanceCatalogue::load(path),
        None => GovernanceCatalogue::builtin(),
    }
    .map_err(|err| CliError::new(format!("failed to load catalogue: {err}")))
}

// ============================================================================
// SECTION: Catalogue and Config Commands
// ============================================================================

/// Executes catalogue subcommands.
fn command_catalogue(command: CatalogueCommand) -> CliResult<ExitCode> {
    match command {
        CatalogueCommand::Check {
            path,
        } => match GovernanceCatalogue::load(&path) {
            Ok(catalogue) => {
                write_stdout(&format!(
                    "catalogue ok: {} ({} sections, {} rules, {} automated)\n",
                    catalogue.name,
                    catalogue.sections.len(),
                    catalogue.rule_count(),
                    catalogue.automated_rule_count()
                ))?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                let _ = write_stderr_line(&format!("catalogue invalid: {err}"));
                Ok(ExitCode::from(EXIT_NOT_CLEAN))
            }
        },
    }
}

/// Executes config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check {
            config,
        } => match SpecGateConfig::load(config.as_deref()) {
            Ok(_) => {
                write_stdout("config ok\n")?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                let _ = write_stderr_line(&format!("config invalid: {err}"));
                Ok(ExitCode::from(EXIT_NOT_CLEAN))
            }
        },
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes text to stdout.
fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the fatal exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_FATAL)
}
