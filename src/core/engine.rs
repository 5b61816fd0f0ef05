//! Evaluation entry point shared by the CLI, the MCP servers and the HTTP API.
//!
//! `evaluate` never fails: an unknown model or a model error comes back as
//! [`Evaluation::Err`], and every call is recorded in the session tracker.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::format::{apply_format, OutputFormat};
use super::input::ModelInput;
use super::registry::ModelRegistry;
use super::sanitize::{sanitize_to_json, SanitizeMode};
use crate::error::SebitResult;
use crate::models::JournalBook;
use crate::report::{analyze, ReportGenerator, SessionAnalysis};
use crate::session::SessionTracker;

/// Engine settings, usually filled from CLI flags / environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_sanitize: SanitizeMode,
    pub journal_root: PathBuf,
    pub report_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_sanitize: SanitizeMode::OmitNullish,
            journal_root: PathBuf::from("./journal_book"),
            report_dir: PathBuf::from("./reports"),
        }
    }
}

/// Per-call presentation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOptions {
    /// Falls back to the engine default when absent.
    #[serde(default)]
    pub sanitize_mode: Option<SanitizeMode>,
    #[serde(default)]
    pub format: OutputFormat,
}

/// `{ model, output }` on success, `{ error }` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Evaluation {
    Ok { model: String, output: Value },
    Err { error: String },
}

impl Evaluation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Evaluation::Ok { .. })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Evaluation::Ok { model, output } => json!({ "model": model, "output": output }),
            Evaluation::Err { error } => json!({ "error": error }),
        }
    }

    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Registry + session tracking + reporting.
#[derive(Debug)]
pub struct Engine {
    registry: ModelRegistry,
    sessions: SessionTracker,
    reports: ReportGenerator,
    default_sanitize: SanitizeMode,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(
            ModelRegistry::standard(JournalBook::new(&config.journal_root)),
            config,
        )
    }

    pub fn with_registry(registry: ModelRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            sessions: SessionTracker::new(),
            reports: ReportGenerator::new(config.report_dir),
            default_sanitize: config.default_sanitize,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn default_sanitize(&self) -> SanitizeMode {
        self.default_sanitize
    }

    /// Run `model` on `input`, sanitize and format the result.
    pub fn evaluate(&self, model: &str, input: &Value, options: EvaluateOptions) -> Evaluation {
        let started = Instant::now();
        let result = self
            .registry
            .resolve(model)
            .and_then(|m| m.run(&ModelInput::from_ref(input)));
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(node) => {
                let mode = options.sanitize_mode.unwrap_or(self.default_sanitize);
                let output = apply_format(sanitize_to_json(&node, mode), options.format);
                self.sessions.log_execution(model, true, elapsed_ms, None);
                debug!(model, sanitize = %mode, "Model evaluated in {:.3}ms", elapsed_ms);
                Evaluation::Ok {
                    model: model.to_string(),
                    output,
                }
            }
            Err(err) => {
                let error = err.to_string();
                self.sessions
                    .log_execution(model, false, elapsed_ms, Some(error.clone()));
                warn!(model, "Model evaluation failed: {}", error);
                Evaluation::Err { error }
            }
        }
    }

    /// `[{ name, label }]` in registry order.
    pub fn list_models(&self) -> Value {
        Value::Array(
            self.registry
                .entries()
                .into_iter()
                .map(|(name, label)| json!({ "name": name, "label": label }))
                .collect(),
        )
    }

    pub fn session_summary(&self) -> SessionAnalysis {
        analyze(&self.sessions.current_session())
    }

    pub fn start_new_session(&self) -> String {
        self.sessions.start_new_session()
    }

    pub fn generate_report(
        &self,
        save_dir: Option<&Path>,
        custom_analysis: Option<&str>,
    ) -> SebitResult<PathBuf> {
        self.reports
            .generate(&self.sessions.current_session(), save_dir, custom_analysis)
    }
}
