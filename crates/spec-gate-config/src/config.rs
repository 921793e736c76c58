// crates/spec-gate-config/src/config.rs
// ============================================================================
// Module: Spec Gate Configuration
// Description: Configuration loading and validation for Spec Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, spec-gate-core, spec-gate-governance
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys are rejected. When no path is given and neither the
//! environment variable nor the default file is present, defaults apply.
//! The backend API key is never stored in the file; the config names the
//! environment variable that holds it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use spec_gate_core::FileAuditSink;
use spec_gate_core::NoopAuditSink;
use spec_gate_core::StderrAuditSink;
use spec_gate_core::ValidationAuditSink;
use spec_gate_governance::ChatCompletionsConfig;
use spec_gate_governance::EngineConfig;
use spec_gate_governance::MAX_CONCURRENCY_LIMIT;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "spec-gate.toml";
/// Environment variable holding an explicit config path.
pub const CONFIG_ENV_VAR: &str = "SPEC_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of a full path.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum backend connect timeout.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 60_000;
/// Maximum backend request timeout.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;
/// Maximum backend response size.
pub(crate) const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Maximum run timeout.
pub(crate) const MAX_RUN_TIMEOUT_MS: u64 = 3_600_000;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Spec Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecGateConfig {
    /// Text-generation backend settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Governance engine settings.
    #[serde(default)]
    pub governance: GovernanceConfig,
    /// Schema validator settings.
    #[serde(default)]
    pub schema: SchemaConfig,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl SpecGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(resolved) = resolve_path(path)? else {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        };
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.governance.validate()?;
        self.schema.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the governance engine settings.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrency: self.governance.max_concurrency,
            temperature: self.backend.temperature,
            run_timeout: self.governance.run_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Text-generation backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum response body size.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// User agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Permit cleartext HTTP base URLs.
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            user_agent: default_user_agent(),
            allow_http: false,
        }
    }
}

impl BackendConfig {
    /// Validates backend settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Invalid("backend.base_url must be non-empty".to_string()));
        }
        if !base_url.starts_with("https://")
            && !(self.allow_http && base_url.starts_with("http://"))
        {
            return Err(ConfigError::Invalid(
                "backend.base_url must use https unless backend.allow_http is set".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.model must be non-empty".to_string()));
        }
        if self.api_key_env.is_empty()
            || !self.api_key_env.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(ConfigError::Invalid(
                "backend.api_key_env must be an environment variable name".to_string(),
            ));
        }
        if !self.temperature.is_finite() || !(0.0 ..= 2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(
                "backend.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if !(1 ..= MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "backend.connect_timeout_ms must be between 1 and {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        if !(1 ..= MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "backend.request_timeout_ms must be between 1 and {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if !(1 ..= MAX_RESPONSE_BYTES).contains(&self.max_response_bytes) {
            return Err(ConfigError::Invalid(format!(
                "backend.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES}"
            )));
        }
        if self.user_agent.trim().is_empty() || self.user_agent.len() > MAX_USER_AGENT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "backend.user_agent must be 1 to {MAX_USER_AGENT_LENGTH} bytes"
            )));
        }
        Ok(())
    }

    /// Reads the API key from the configured environment variable.
    ///
    /// Returns `None` when the variable is unset or blank.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|value| !value.trim().is_empty())
    }

    /// Builds backend connection settings with the given API key.
    #[must_use]
    pub fn chat_completions_config(&self, api_key: Option<String>) -> ChatCompletionsConfig {
        ChatCompletionsConfig {
            base_url: self.base_url.trim().to_string(),
            model: self.model.clone(),
            api_key,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_response_bytes: self.max_response_bytes,
            user_agent: self.user_agent.clone(),
            allow_http: self.allow_http,
        }
    }
}

/// Governance engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    /// Maximum backend calls in flight.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Optional wall-clock budget per run.
    #[serde(default)]
    pub run_timeout_ms: Option<u64>,
    /// Catalogue document path; the bundled catalogue is used when absent.
    #[serde(default)]
    pub catalogue_path: Option<PathBuf>,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            run_timeout_ms: None,
            catalogue_path: None,
        }
    }
}

impl GovernanceConfig {
    /// Validates governance settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_CONCURRENCY_LIMIT).contains(&self.max_concurrency) {
            return Err(ConfigError::Invalid(format!(
                "governance.max_concurrency must be between 1 and {MAX_CONCURRENCY_LIMIT}"
            )));
        }
        if let Some(timeout) = self.run_timeout_ms
            && !(1 ..= MAX_RUN_TIMEOUT_MS).contains(&timeout)
        {
            return Err(ConfigError::Invalid(format!(
                "governance.run_timeout_ms must be between 1 and {MAX_RUN_TIMEOUT_MS}"
            )));
        }
        if let Some(path) = &self.catalogue_path {
            validate_path_field("governance.catalogue_path", path)?;
        }
        Ok(())
    }
}

/// Schema validator configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// Reference schema path; the bundled schema is used when absent.
    #[serde(default)]
    pub reference_schema_path: Option<PathBuf>,
}

impl SchemaConfig {
    /// Validates schema settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.reference_schema_path {
            validate_path_field("schema.reference_schema_path", path)?;
        }
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(path)) => validate_path_field("audit.path", path),
            _ => Ok(()),
        }
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn ValidationAuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::File, Some(path)) => FileAuditSink::new(path)
                .map(|sink| Arc::new(sink) as Arc<dyn ValidationAuditSink>)
                .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display()))),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns `None` when only the default file applies and it does not exist.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path field against length constraints.
fn validate_path_field(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default backend base URL.
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Default model identifier.
fn default_model() -> String {
    "gpt-4o".to_string()
}

/// Default API key environment variable.
fn default_api_key_env() -> String {
    "SPEC_GATE_API_KEY".to_string()
}

/// Default sampling temperature.
const fn default_temperature() -> f32 {
    spec_gate_governance::DEFAULT_TEMPERATURE
}

/// Default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    5_000
}

/// Default request timeout.
const fn default_request_timeout_ms() -> u64 {
    120_000
}

/// Default response size limit.
const fn default_max_response_bytes() -> usize {
    1024 * 1024
}

/// Default user agent.
fn default_user_agent() -> String {
    concat!("spec-gate/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Default concurrency bound.
const fn default_max_concurrency() -> usize {
    spec_gate_governance::DEFAULT_MAX_CONCURRENCY
}
