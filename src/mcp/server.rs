//! SEBIT MCP Server implementation
//!
//! Implements the Model Context Protocol over stdin/stdout using JSON-RPC.
//! The same request handler serves the HTTP `/mcp` endpoint.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::core::{Engine, EvaluateOptions, OutputFormat, SanitizeMode};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "sebit-mcp";

/// JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// `-32700` response for a message that is not valid JSON-RPC.
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::failure(Value::Null, -32700, format!("Parse error: {}", detail))
    }
}

/// MCP Tool definition
#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

/// MCP front-end over a shared [`Engine`].
#[derive(Debug, Clone)]
pub struct SebitMcpServer {
    engine: Arc<Engine>,
}

impl SebitMcpServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Handle one raw JSON-RPC message. `None` means no reply (notification).
    pub fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(&request),
            Err(e) => Some(JsonRpcResponse::parse_error(e)),
        }
    }

    /// Handle an already-decoded JSON body (HTTP transport).
    pub fn handle_value(&self, body: Value) -> Option<JsonRpcResponse> {
        match serde_json::from_value::<JsonRpcRequest>(body) {
            Ok(request) => self.handle_request(&request),
            Err(e) => Some(JsonRpcResponse::parse_error(e)),
        }
    }

    /// Handle a JSON-RPC request
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone().unwrap_or(Value::Null);
        debug!(method = %request.method, "MCP request");

        match request.method.as_str() {
            "initialize" => Some(JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {
                            "listChanged": false
                        }
                    },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    },
                    "instructions": "SEBIT financial models. Call list_models for the model names, then run_model with { model, input }. Results are sanitized JSON; session_summary and generate_report describe the current session."
                }),
            )),
            "notifications/initialized" => None, // No response for notifications
            "tools/list" => Some(JsonRpcResponse::success(
                id,
                json!({
                    "tools": get_tools(&self.engine)
                }),
            )),
            "tools/call" => {
                let tool_name = request
                    .params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(json!({}));

                Some(JsonRpcResponse::success(
                    id,
                    self.call_tool(tool_name, &arguments),
                ))
            }
            "ping" => Some(JsonRpcResponse::success(id, json!({}))),
            _ => Some(JsonRpcResponse::failure(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            )),
        }
    }

    /// Execute a tool call
    fn call_tool(&self, name: &str, arguments: &Value) -> Value {
        match name {
            "list_models" => tool_text(&pretty(&self.engine.list_models()), false),
            "run_model" => {
                let model = arguments
                    .get("model")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let input = arguments.get("input").cloned().unwrap_or(json!({}));

                let sanitize_mode = match arguments.get("sanitizeMode").and_then(|v| v.as_str()) {
                    Some(mode) => match mode.parse::<SanitizeMode>() {
                        Ok(mode) => Some(mode),
                        Err(e) => return tool_text(&e, true),
                    },
                    None => None,
                };
                let format = match arguments.get("format").and_then(|v| v.as_str()) {
                    Some(format) => match format.parse::<OutputFormat>() {
                        Ok(format) => format,
                        Err(e) => return tool_text(&e, true),
                    },
                    None => OutputFormat::Raw,
                };

                let evaluation = self.engine.evaluate(
                    model,
                    &input,
                    EvaluateOptions {
                        sanitize_mode,
                        format,
                    },
                );
                match evaluation.to_json() {
                    Value::Object(map) if map.contains_key("error") => tool_text(
                        map.get("error").and_then(|e| e.as_str()).unwrap_or(""),
                        true,
                    ),
                    result => tool_text(&pretty(&result), false),
                }
            }
            "session_summary" => {
                let summary = serde_json::to_value(self.engine.session_summary())
                    .unwrap_or(Value::Null);
                tool_text(&pretty(&summary), false)
            }
            "generate_report" => {
                let save_path = arguments.get("savePath").and_then(|v| v.as_str());
                let custom = arguments.get("customAnalysis").and_then(|v| v.as_str());
                match self
                    .engine
                    .generate_report(save_path.map(Path::new), custom)
                {
                    Ok(path) => tool_text(
                        &format!("Session report saved: {}", path.display()),
                        false,
                    ),
                    Err(e) => tool_text(&format!("Report generation failed: {}", e), true),
                }
            }
            "new_session" => {
                let id = self.engine.start_new_session();
                tool_text(&format!("New session started: {}", id), false)
            }
            _ => tool_text(&format!("Unknown tool: {}", name), true),
        }
    }
}

fn tool_text(text: &str, is_error: bool) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": text
        }],
        "isError": is_error
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Get all available tools
fn get_tools(engine: &Engine) -> Vec<Tool> {
    let names: Vec<&str> = engine.registry().names();
    vec![
        Tool {
            name: "list_models".to_string(),
            description: "List available SEBIT models with their labels.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: "run_model".to_string(),
            description: "Run a SEBIT model by name with a JSON input payload.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "model": {
                        "type": "string",
                        "enum": names,
                        "description": "Model name"
                    },
                    "input": {
                        "type": "object",
                        "description": "Model input; numbers may be given as strings such as \"1,000\" or \"15%\""
                    },
                    "sanitizeMode": {
                        "type": "string",
                        "enum": ["omit", "null", "omitNullish"],
                        "description": "How undefined, null and non-finite values are handled",
                        "default": "omitNullish"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["raw", "pct"],
                        "description": "pct renders rate/pct/ratio fields as percent strings",
                        "default": "raw"
                    }
                },
                "required": ["model"]
            }),
        },
        Tool {
            name: "session_summary".to_string(),
            description: "Summarize the model runs of the current session.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        Tool {
            name: "generate_report".to_string(),
            description: "Write a Markdown analysis report of the current session.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "savePath": {
                        "type": "string",
                        "description": "Directory for the report (defaults to the configured report directory)"
                    },
                    "customAnalysis": {
                        "type": "string",
                        "description": "Extra analysis text appended to the opinion"
                    }
                }
            }),
        },
        Tool {
            name: "new_session".to_string(),
            description: "Start a new tracking session.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// Run the MCP server synchronously over stdin/stdout
///
/// # Coverage Exclusion
/// This function reads from stdin forever until EOF. Cannot be unit tested.
/// The request handling logic is tested via `handle_request()`.
#[cfg(not(coverage))]
pub fn run_mcp_server_sync(engine: Arc<Engine>) {
    let server = SebitMcpServer::new(engine);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let reader = BufReader::new(stdin.lock());
    info!("MCP stdio server ready");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("stdin closed: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        if let Some(resp) = server.handle_message(&line) {
            match serde_json::to_string(&resp) {
                Ok(text) => {
                    let _ = writeln!(stdout, "{}", text);
                    let _ = stdout.flush();
                }
                Err(e) => warn!("Failed to serialize response: {}", e),
            }
        }
    }
    info!("MCP stdio server stopped");
}

/// Stub for coverage builds
#[cfg(coverage)]
pub fn run_mcp_server_sync(_engine: Arc<Engine>) {}
