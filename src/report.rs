//! Session analysis and the Markdown session report.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{SebitError, SebitResult};
use crate::session::SessionData;

/// Model excluded from usage analysis (bookkeeping, not a calculation).
pub const JOURNAL_MODEL: &str = "journal";

pub const RECOMMENDATIONS: [&str; 4] = [
    "Monitor model performance regularly and tune where needed",
    "Strengthen validation of input data quality",
    "Analyse error patterns and put preventive checks in place",
    "Consider tuning the most frequently used models",
];

struct ModelDescription {
    title: &'static str,
    purpose: &'static str,
    insight: &'static str,
}

fn describe(model: &str) -> Option<ModelDescription> {
    let (title, purpose, insight) = match model {
        "dda" => (
            "Dynamic Depreciation Analysis",
            "Usage- and market-sensitive depreciation of an asset over its life",
            "Tracking value loss as the asset is used gives a truer carrying amount than straight-line depreciation.",
        ),
        "lam" => (
            "Lease Asset Model",
            "Amortization, interest and revaluation of a right-of-use asset",
            "Lease accounting aligned with IFRS 16 makes the balance sheet more transparent.",
        ),
        "rvm" => (
            "Resource Valuation Model",
            "Fair value of extracted resources from mining pace and market moves",
            "Valuing resources accurately supports investment and allocation decisions.",
        ),
        "ceem" => (
            "Consumable Expense Model",
            "Usage pattern and reappraised cost of consumables",
            "Managing consumables efficiently lowers operating cost and improves budgeting.",
        ),
        "bdm" => (
            "Bond Effective Interest Model",
            "Effective interest expense and carrying amount of a bond",
            "Recognizing interest accurately improves the reliability of reported results.",
        ),
        "belm" => (
            "Expected Loss Model",
            "Expected credit loss on receivables under IFRS 9",
            "Recognizing losses early strengthens risk management.",
        ),
        "cprm" => (
            "Convertible Bond Risk Model",
            "Conversion-rate risk of convertible bonds",
            "Reflecting the hybrid nature of convertibles keeps investment risk in check.",
        ),
        "ocim" => (
            "OCI Compounded Increase Model",
            "Compounded change in other comprehensive income",
            "Seeing the long-run effect of OCI supports capital management.",
        ),
        "farex" => (
            "Foreign Exchange Adjustment Model",
            "FX indicator adjusted for the trade balance",
            "Managing FX exposure limits losses from exchange-rate volatility.",
        ),
        "tctbeam" => (
            "Trigonometric Breakeven Analysis Model",
            "Cost structure drift and break-even revenue",
            "Cyclical cost shifts give a more realistic break-even point.",
        ),
        "cpmrv" => (
            "Crypto Real Value Model",
            "Real value of a crypto asset from growth and decline performance",
            "Accounting for volatility yields a steadier basis for digital asset strategy.",
        ),
        "dcbpra" => (
            "Beta-Adjusted Return Analysis Model",
            "CAPM return with a risk-spread adjusted beta",
            "Risk-adjusted performance supports portfolio optimisation.",
        ),
        _ => return None,
    };
    Some(ModelDescription {
        title,
        purpose,
        insight,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelCount {
    pub model: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Summary statistics of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalysis {
    pub session_id: String,
    pub total_executions: usize,
    pub journal_executions: usize,
    /// Percent, 0 when nothing ran.
    pub success_rate: f64,
    /// Top five, journal excluded.
    pub most_used_models: Vec<ModelCount>,
    pub avg_execution_time: f64,
    pub time_range: TimeRange,
    /// At most five `model: error` lines.
    pub error_summary: Vec<String>,
}

pub fn analyze(session: &SessionData) -> SessionAnalysis {
    let all = &session.executions;
    let total = all.len();
    let successful = all.iter().filter(|e| e.success).count();
    let success_rate = if total > 0 {
        successful as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for exec in all.iter().filter(|e| e.model_name != JOURNAL_MODEL) {
        let count = counts.entry(exec.model_name.as_str()).or_insert(0);
        if *count == 0 {
            first_seen.push(exec.model_name.as_str());
        }
        *count += 1;
    }
    let mut most_used: Vec<ModelCount> = first_seen
        .into_iter()
        .map(|model| ModelCount {
            model: model.to_string(),
            count: counts.get(model).copied().unwrap_or(0),
        })
        .collect();
    // stable: ties keep first-use order
    most_used.sort_by(|a, b| b.count.cmp(&a.count));
    most_used.truncate(5);

    let avg_execution_time = if total > 0 {
        all.iter().map(|e| e.execution_time).sum::<f64>() / total as f64
    } else {
        0.0
    };

    let time_range = TimeRange {
        start: all
            .iter()
            .map(|e| e.timestamp)
            .min()
            .unwrap_or(session.start_time),
        end: all
            .iter()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or(session.start_time),
    };

    let error_summary = all
        .iter()
        .filter(|e| !e.success)
        .filter_map(|e| e.error.as_ref().map(|err| format!("{}: {}", e.model_name, err)))
        .take(5)
        .collect();

    SessionAnalysis {
        session_id: session.session_id.clone(),
        total_executions: total,
        journal_executions: all.iter().filter(|e| e.model_name == JOURNAL_MODEL).count(),
        success_rate,
        most_used_models: most_used,
        avg_execution_time,
        time_range,
        error_summary,
    }
}

/// Overall opinion keyed on the success rate.
pub fn opinion(success_rate: f64) -> &'static str {
    if success_rate >= 90.0 {
        "Excellent: model runs were very stable. Keep the current setup and consider further tuning."
    } else if success_rate >= 70.0 {
        "Good: most runs succeeded, but the failing cases should be reviewed."
    } else {
        "Needs attention: the failure rate is high. Review input validation and model stability."
    }
}

/// Render the report as Markdown.
pub fn render(
    session: &SessionData,
    custom_analysis: Option<&str>,
    generated_at: DateTime<Local>,
) -> String {
    let analysis = analyze(session);
    let mut md = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(md, "# SEBIT Session Analysis Report\n");
    let _ = writeln!(
        md,
        "- Generated: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(md, "- Session ID: `{}`\n", session.session_id);

    let _ = writeln!(md, "## Session Summary\n");
    let _ = writeln!(md, "- Total executions: {}", analysis.total_executions);
    let _ = writeln!(
        md,
        "  - Analysis models: {}, journal entries: {}",
        analysis.total_executions - analysis.journal_executions,
        analysis.journal_executions
    );
    let _ = writeln!(md, "- Success rate: {:.1}%", analysis.success_rate);
    let _ = writeln!(
        md,
        "- Average execution time: {:.2}ms",
        analysis.avg_execution_time
    );
    let _ = writeln!(
        md,
        "- Session window: {} ~ {}\n",
        analysis.time_range.start.with_timezone(&Local).format("%H:%M:%S"),
        analysis.time_range.end.with_timezone(&Local).format("%H:%M:%S")
    );

    if !analysis.most_used_models.is_empty() {
        let _ = writeln!(md, "## Most Used Models\n");
        for ModelCount { model, count } in &analysis.most_used_models {
            let title = describe(model).map(|d| d.title).unwrap_or(model.as_str());
            let _ = writeln!(md, "- {} runs - {}", count, title);
        }
        let _ = writeln!(md);

        let _ = writeln!(md, "## Details and Insights\n");
        for ModelCount { model, count } in analysis.most_used_models.iter().take(3) {
            if let Some(desc) = describe(model) {
                let _ = writeln!(md, "### {} ({} runs)\n", desc.title, count);
                let _ = writeln!(md, "- Purpose: {}", desc.purpose);
                let _ = writeln!(md, "- Insight: {}\n", desc.insight);
            }
        }
    }

    if !analysis.error_summary.is_empty() {
        let _ = writeln!(md, "## Errors\n");
        for error in &analysis.error_summary {
            let _ = writeln!(md, "- {}", error.replace('\n', " "));
        }
        let _ = writeln!(md);
    }

    let _ = writeln!(md, "## Overall Opinion\n");
    let _ = writeln!(md, "{}", opinion(analysis.success_rate));
    if let Some(custom) = custom_analysis.filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(md, "\nAdditional analysis: {}", custom);
    }
    let _ = writeln!(md, "\n### Recommendations\n");
    for (idx, rec) in RECOMMENDATIONS.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", idx + 1, rec);
    }
    md
}

/// Writes session reports into a directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    default_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }

    pub fn default_dir(&self) -> &Path {
        &self.default_dir
    }

    /// Render and save `SEBIT-Report_<timestamp>.md`; returns the file path.
    pub fn generate(
        &self,
        session: &SessionData,
        save_dir: Option<&Path>,
        custom_analysis: Option<&str>,
    ) -> SebitResult<PathBuf> {
        let dir = save_dir.unwrap_or(&self.default_dir);
        std::fs::create_dir_all(dir).map_err(|e| {
            SebitError::Report(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let now = Local::now();
        let path = dir.join(format!(
            "SEBIT-Report_{}.md",
            now.format("%Y-%m-%d_%H-%M-%S")
        ));
        std::fs::write(&path, render(session, custom_analysis, now)).map_err(|e| {
            SebitError::Report(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!("Session report generated successfully: {}", path.display());
        Ok(path)
    }
}
