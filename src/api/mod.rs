//! SEBIT API Server module
//!
//! HTTP REST API and MCP-over-HTTP for the SEBIT models.
//! Run with `sebit-server`.

pub mod handlers;
pub mod mcp_sessions;
pub mod server;

pub use mcp_sessions::{McpSessions, MCP_SESSION_HEADER};
pub use server::{build_router, run_api_server, ApiConfig, AppState};
