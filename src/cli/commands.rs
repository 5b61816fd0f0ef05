use crate::core::{Engine, EvaluateOptions, Evaluation};
use crate::error::{SebitError, SebitResult};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

/// Where `run` takes its model input from.
#[derive(Debug, Clone, Default)]
pub enum InputSource {
    /// `{}`
    #[default]
    Empty,
    /// YAML (`.yaml`/`.yml`) or JSON file
    File(PathBuf),
    /// Inline JSON text
    Json(String),
}

impl InputSource {
    pub fn from_args(input: Option<PathBuf>, json: Option<String>) -> Self {
        match (input, json) {
            (Some(path), _) => InputSource::File(path),
            (None, Some(text)) => InputSource::Json(text),
            (None, None) => InputSource::Empty,
        }
    }

    pub fn load(&self) -> SebitResult<Value> {
        match self {
            InputSource::Empty => Ok(Value::Object(Map::new())),
            InputSource::File(path) => load_input(path),
            InputSource::Json(text) => Ok(serde_json::from_str(text)?),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Read a model input file; YAML by extension, JSON otherwise.
pub fn load_input(path: &Path) -> SebitResult<Value> {
    let content = fs::read_to_string(path)?;
    if is_yaml(path) {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Set `options.debug = true` on an object input.
fn enable_debug(input: &mut Value) {
    if let Value::Object(fields) = input {
        let options = fields
            .entry("options")
            .or_insert_with(|| Value::Object(Map::new()));
        if !options.is_object() {
            *options = Value::Object(Map::new());
        }
        if let Value::Object(options) = options {
            options.insert("debug".to_string(), Value::Bool(true));
        }
    }
}

fn print_evaluation(evaluation: &Evaluation) {
    match evaluation {
        Evaluation::Ok { .. } => println!("{}", evaluation.to_pretty_string()),
        Evaluation::Err { error } => eprintln!("{} {}", "❌".red(), error.red()),
    }
}

/// Execute the list command
pub fn list(engine: &Engine) -> SebitResult<()> {
    println!("{}", "📋 SEBIT Models".bold().green());
    println!("{}", "─".repeat(44));
    for (name, label) in engine.registry().entries() {
        println!("  {:<10} {}", name.bright_blue().bold(), label);
    }
    println!("{}", "─".repeat(44));
    println!("  {} models", engine.registry().len());
    Ok(())
}

/// Execute the run command
pub fn run(
    engine: &Engine,
    model: &str,
    source: &InputSource,
    options: EvaluateOptions,
    debug: bool,
) -> SebitResult<()> {
    let mut input = source.load()?;
    if debug {
        enable_debug(&mut input);
    }

    let evaluation = engine.evaluate(model, &input, options);
    print_evaluation(&evaluation);
    match evaluation {
        Evaluation::Ok { .. } => Ok(()),
        Evaluation::Err { error } => Err(SebitError::Validation(error)),
    }
}

/// Execute the watch command
pub fn watch(engine: &Engine, model: &str, file: PathBuf, options: EvaluateOptions) -> SebitResult<()> {
    println!("{}", "👁️  SEBIT - Watch Mode".bold().green());
    println!("   Model: {}", model.bright_blue());
    println!("   Watching: {}", file.display());
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !file.exists() {
        return Err(SebitError::Validation(format!(
            "File not found: {}",
            file.display()
        )));
    }
    // Fail fast on a typo before entering the loop
    engine.registry().resolve(model)?;

    let canonical_path = file.canonicalize()?;
    let parent_dir = canonical_path
        .parent()
        .ok_or_else(|| SebitError::Validation("Cannot determine parent directory".to_string()))?;

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(200), tx)
        .map_err(|e| SebitError::Validation(format!("Failed to create file watcher: {}", e)))?;
    debouncer
        .watcher()
        .watch(parent_dir, RecursiveMode::NonRecursive)
        .map_err(|e| SebitError::Validation(format!("Failed to watch directory: {}", e)))?;

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(engine, model, &canonical_path, options);
    println!();

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event.path.file_name() == canonical_path.file_name()
                });
                if relevant {
                    println!(
                        "\n{} {}",
                        "🔄 Change detected at".cyan(),
                        chrono::Local::now().format("%H:%M:%S").to_string().cyan()
                    );
                    run_watch_action(engine, model, &canonical_path, options);
                    println!();
                }
            }
            Ok(Err(error)) => {
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

fn run_watch_action(engine: &Engine, model: &str, file: &Path, options: EvaluateOptions) {
    match load_input(file) {
        Ok(input) => print_evaluation(&engine.evaluate(model, &input, options)),
        Err(e) => println!("{} {}", "❌ Failed to read input:".bold().red(), e),
    }
}

/// Execute the journal command
///
/// The file holds one entry object or a list of them.
pub fn journal(engine: &Engine, file: PathBuf) -> SebitResult<()> {
    println!("{}", "📒 SEBIT - Journal Book".bold().green());
    println!("   Input: {}\n", file.display());

    let entries = match load_input(&file)? {
        Value::Array(entries) => entries,
        entry => vec![entry],
    };

    let mut failed = 0usize;
    for (idx, entry) in entries.iter().enumerate() {
        let evaluation = engine.evaluate("journal", entry, EvaluateOptions::default());
        match &evaluation {
            Evaluation::Ok { output, .. } => {
                let status = if output["duplicated"] == Value::Bool(true) {
                    "duplicate, skipped".yellow()
                } else {
                    "recorded".green()
                };
                println!(
                    "  #{:<3} {} → {} [{}]",
                    idx + 1,
                    status,
                    output["filePath"].as_str().unwrap_or_default(),
                    output["sheet"].as_str().unwrap_or_default()
                );
            }
            Evaluation::Err { error } => {
                failed += 1;
                println!("  #{:<3} {} {}", idx + 1, "rejected:".red(), error);
            }
        }
    }

    println!();
    if failed > 0 {
        return Err(SebitError::Validation(format!(
            "{} of {} entries rejected",
            failed,
            entries.len()
        )));
    }
    println!("{}", "✅ Journal complete".bold().green());
    Ok(())
}

/// Execute the report command
///
/// Runs the optional batch file (a list of `{model, input}`), then writes
/// the Markdown report of the session.
pub fn report(
    engine: &Engine,
    batch: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    custom_analysis: Option<String>,
) -> SebitResult<()> {
    println!("{}", "📊 SEBIT - Session Report".bold().green());

    if let Some(batch) = batch {
        let runs = match load_input(&batch)? {
            Value::Array(runs) => runs,
            _ => {
                return Err(SebitError::Validation(
                    "batch file must be a list of {model, input}".to_string(),
                ))
            }
        };
        for run in &runs {
            let model = run["model"].as_str().unwrap_or_default();
            let input = run.get("input").cloned().unwrap_or(Value::Null);
            let evaluation = engine.evaluate(model, &input, EvaluateOptions::default());
            let mark = if evaluation.is_ok() { "✅" } else { "❌" };
            println!("   {} {}", mark, model);
        }
    }

    let summary = engine.session_summary();
    println!(
        "   Executions: {} | Success rate: {:.1}%",
        summary.total_executions, summary.success_rate
    );

    let path = engine.generate_report(out_dir.as_deref(), custom_analysis.as_deref())?;
    println!("{} {}", "✅ Report written:".bold().green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> Engine {
        Engine::new(EngineConfig {
            journal_root: dir.path().join("journal"),
            report_dir: dir.path().join("reports"),
            ..EngineConfig::default()
        })
    }

    // =========================================================================
    // Input loading
    // =========================================================================

    #[test]
    fn test_load_yaml_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bdm.yaml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "faceValue: 1000\ncouponRatePerPeriod: \"2.5%\"").unwrap();

        let value = load_input(&path).unwrap();
        assert_eq!(value, json!({ "faceValue": 1000, "couponRatePerPeriod": "2.5%" }));
    }

    #[test]
    fn test_load_json_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dda.json");
        fs::write(&path, r#"{"baseValue": 500}"#).unwrap();

        assert_eq!(load_input(&path).unwrap(), json!({ "baseValue": 500 }));
    }

    #[test]
    fn test_input_source_precedence() {
        let source = InputSource::from_args(Some(PathBuf::from("a.json")), Some("{}".into()));
        assert!(matches!(source, InputSource::File(_)));
        assert!(matches!(InputSource::from_args(None, None), InputSource::Empty));
        assert_eq!(InputSource::Empty.load().unwrap(), json!({}));
        assert_eq!(
            InputSource::Json(r#"{"x": 1}"#.into()).load().unwrap(),
            json!({ "x": 1 })
        );
    }

    #[test]
    fn test_enable_debug_merges_options() {
        let mut input = json!({ "options": { "roundStep": 0.01 } });
        enable_debug(&mut input);
        assert_eq!(input["options"], json!({ "roundStep": 0.01, "debug": true }));

        let mut input = json!({ "options": 3 });
        enable_debug(&mut input);
        assert_eq!(input["options"], json!({ "debug": true }));
    }

    // =========================================================================
    // Commands
    // =========================================================================

    #[test]
    fn test_run_unknown_model_is_error() {
        let dir = TempDir::new().unwrap();
        let result = run(
            &engine(&dir),
            "nope",
            &InputSource::Empty,
            EvaluateOptions::default(),
            false,
        );
        assert!(matches!(result, Err(SebitError::Validation(msg)) if msg.starts_with("unknown model: nope")));
    }

    #[test]
    fn test_run_known_model() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        run(
            &engine,
            "cprm",
            &InputSource::Json(r#"{"baseCR": 0.5}"#.into()),
            EvaluateOptions::default(),
            true,
        )
        .unwrap();
        assert_eq!(engine.session_summary().total_executions, 1);
    }

    #[test]
    fn test_journal_command_records_entries() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let path = dir.path().join("entries.json");
        fs::write(
            &path,
            r#"[
                {"company": "Acme", "date": "2025-03-04", "vendor": "Cafe", "account": "Meals", "debit": 12.5, "language": "en"},
                {"company": "Acme", "date": "2025-03-04", "vendor": "Cafe", "account": "Meals", "debit": 12.5, "language": "en"}
            ]"#,
        )
        .unwrap();

        journal(&engine, path).unwrap();
        assert!(dir
            .path()
            .join("journal/Acme/2025/Cafe_2025.xlsx")
            .exists());
    }

    #[test]
    fn test_journal_command_reports_rejections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"company": "Acme"}"#).unwrap();

        let err = journal(&engine(&dir), path).unwrap_err();
        assert_eq!(err.to_string(), "1 of 1 entries rejected");
    }

    #[test]
    fn test_report_command_with_batch() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let batch = dir.path().join("batch.yaml");
        fs::write(
            &batch,
            "- model: dda\n  input: {baseValue: 1000}\n- model: nope\n",
        )
        .unwrap();
        let out = dir.path().join("out");

        report(&engine, Some(batch), Some(out.clone()), None).unwrap();

        assert_eq!(engine.session_summary().total_executions, 2);
        let written: Vec<_> = fs::read_dir(&out).unwrap().collect();
        assert_eq!(written.len(), 1);
    }
}
