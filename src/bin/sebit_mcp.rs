//! SEBIT MCP Server binary
//!
//! Model Context Protocol server for AI agent integration.
//! Run with: `sebit-mcp`
//!
//! stdout carries the protocol, so logs go to `SEBIT_LOG_FILE`
//! (default `debug.log`), truncated at every launch.
//!
//! Configure in an MCP client:
//! ```json
//! {
//!   "mcpServers": {
//!     "sebit": {
//!       "command": "sebit-mcp",
//!       "env": { "JOURNAL_ROOT": "/data/journal_book" }
//!     }
//!   }
//! }
//! ```

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Parser;
use sebit_models::cli::EngineArgs;
use sebit_models::core::Engine;
use sebit_models::mcp::run_mcp_server_sync;

#[derive(Parser, Debug)]
#[command(name = "sebit-mcp")]
#[command(version)]
#[command(about = "SEBIT MCP Server - JSON-RPC over stdin/stdout")]
struct Args {
    #[command(flatten)]
    engine: EngineArgs,

    /// Log file (never stdout/stderr)
    #[arg(long, default_value = "debug.log", env = "SEBIT_LOG_FILE")]
    log_file: PathBuf,
}

/// Truncate the log with a start banner, then append through `tracing`.
fn init_file_logging(path: &Path) {
    let banner = format!(
        "=== sebit-mcp {} started {} ===\n",
        env!("CARGO_PKG_VERSION"),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    if fs::write(path, banner).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new().append(true).open(path) else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sebit_models=debug".into()),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_file_logging(&args.log_file);

    let engine = Arc::new(Engine::new(args.engine.into()));
    run_mcp_server_sync(engine);
}
