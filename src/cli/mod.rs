//! CLI command handlers

pub mod commands;

use std::path::PathBuf;

use crate::core::{EngineConfig, SanitizeMode};

pub use commands::{journal, list, load_input, report, run, watch, InputSource};

/// Engine settings shared by every binary (`--flag` or environment).
#[derive(clap::Args, Debug, Clone)]
pub struct EngineArgs {
    /// Default output sanitize mode: omit, null or omitNullish
    #[arg(long, default_value = "omitNullish", env = "SANITIZE_MODE")]
    pub sanitize_mode: SanitizeMode,

    /// Root directory of the journal books
    #[arg(long, default_value = "./journal_book", env = "JOURNAL_ROOT")]
    pub journal_root: PathBuf,

    /// Directory for session reports
    #[arg(long, default_value = "./reports", env = "SEBIT_REPORT_DIR")]
    pub report_dir: PathBuf,
}

impl From<EngineArgs> for EngineConfig {
    fn from(args: EngineArgs) -> Self {
        EngineConfig {
            default_sanitize: args.sanitize_mode,
            journal_root: args.journal_root,
            report_dir: args.report_dir,
        }
    }
}
