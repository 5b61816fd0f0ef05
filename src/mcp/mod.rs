//! SEBIT MCP Server
//!
//! Model Context Protocol server exposing the SEBIT models to AI tools.
//!
//! ## Tools
//! - `list_models` - Model names and labels
//! - `run_model` - Run a model on a JSON input (`sanitizeMode`, `format`)
//! - `session_summary` - Statistics of the current session
//! - `generate_report` - Markdown session report
//! - `new_session` - Start a new tracking session
//!
//! ## Usage
//!
//! Configure in an MCP client:
//! ```json
//! {
//!   "mcpServers": {
//!     "sebit": {
//!       "command": "sebit-mcp"
//!     }
//!   }
//! }
//! ```

pub mod server;

pub use server::run_mcp_server_sync;
pub use server::{JsonRpcRequest, JsonRpcResponse, SebitMcpServer};
