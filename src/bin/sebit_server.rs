//! SEBIT API Server binary
//!
//! HTTP REST API and MCP-over-HTTP for the SEBIT models.

use std::sync::Arc;

use clap::Parser;
use sebit_models::api::{run_api_server, ApiConfig};
use sebit_models::cli::EngineArgs;
use sebit_models::core::Engine;

#[derive(Parser, Debug)]
#[command(name = "sebit-server")]
#[command(version)]
#[command(about = "SEBIT API Server - HTTP REST API for the SEBIT financial models")]
#[command(long_about = r#"
SEBIT API Server - HTTP REST API

Provides RESTful endpoints for the SEBIT models:
  - GET  /api/v1/models        - List model names and labels
  - POST /api/v1/run           - Run a model: {model, input, sanitizeMode?, format?}
  - POST /api/v1/models/:name  - Run a model; the request body is its input
  - GET  /api/v1/session       - Current session statistics
  - POST /api/v1/session/new   - Start a new session
  - POST /api/v1/report        - Write a Markdown session report
  - POST /mcp                  - MCP JSON-RPC (Mcp-Session-Id header)

Additional endpoints:
  - GET  /health               - Health check
  - GET  /version              - Server version info
  - GET  /                     - API documentation

Features:
  - CORS (CORS_ALLOW_ORIGINS, comma separated; empty allows any origin)
  - Graceful shutdown on SIGINT/SIGTERM
  - JSON response format with request IDs
  - Tracing and structured logging

Example usage:
  sebit-server                           # Start on localhost:3333
  sebit-server --host 0.0.0.0 --port 8080

  curl -X POST http://localhost:3333/api/v1/models/bdm \
    -H "Content-Type: application/json" \
    -d '{"carryingAmountStart": 980, "faceValue": 1000, "couponRatePerPeriod": 0.025, "yieldRatePerPeriod": 0.03}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SEBIT_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "3333", env = "SEBIT_PORT")]
    port: u16,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "CORS_ALLOW_ORIGINS", value_delimiter = ',')]
    cors_allow_origins: Vec<String>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
        cors_allow_origins: args
            .cors_allow_origins
            .into_iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect(),
    };
    let engine = Arc::new(Engine::new(args.engine.into()));

    run_api_server(config, engine).await
}
