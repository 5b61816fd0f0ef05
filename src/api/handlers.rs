//! API request handlers
//!
//! Handlers for all REST API endpoints and the HTTP MCP endpoint.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::{EvaluateOptions, Evaluation, OutputFormat, SanitizeMode};
use crate::mcp::JsonRpcResponse;
use crate::report::SessionAnalysis;

use super::mcp_sessions::MCP_SESSION_HEADER;
use super::server::AppState;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            description: description.to_string(),
        }
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "SEBIT API Server".to_string(),
        version: state.version.clone(),
        description: "HTTP API for the SEBIT financial valuation models".to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/health", "Health check endpoint"),
            EndpointInfo::new("GET", "/version", "Get server version"),
            EndpointInfo::new("GET", "/api/v1/models", "List model names and labels"),
            EndpointInfo::new("POST", "/api/v1/run", "Run a model: {model, input, sanitizeMode?, format?}"),
            EndpointInfo::new("POST", "/api/v1/models/:name", "Run a model; the body is its input"),
            EndpointInfo::new("GET", "/api/v1/session", "Current session statistics"),
            EndpointInfo::new("POST", "/api/v1/session/new", "Start a new tracking session"),
            EndpointInfo::new("POST", "/api/v1/report", "Write a Markdown session report"),
            EndpointInfo::new("POST", "/mcp", "MCP JSON-RPC endpoint (Mcp-Session-Id)"),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub models: usize,
    pub ts: String,
}

/// GET /health - Health check
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        models: state.engine.registry().len(),
        ts: chrono::Utc::now().to_rfc3339(),
    })
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub models: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        models: state
            .engine
            .registry()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
    }))
}

/// GET /api/v1/models - `[{name, label}]`
pub async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.engine.list_models()))
}

/// Run request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub model: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub sanitize_mode: Option<SanitizeMode>,
    #[serde(default)]
    pub format: OutputFormat,
}

/// POST /api/v1/run - Run a model
pub async fn run(State(state): State<Arc<AppState>>, Json(req): Json<RunRequest>) -> Response {
    let options = EvaluateOptions {
        sanitize_mode: req.sanitize_mode,
        format: req.format,
    };
    evaluate(&state, &req.model, &req.input, options)
}

/// POST /api/v1/models/:name - Connector style, the body is the model input
pub async fn run_named(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Response {
    evaluate(&state, &name, &input, EvaluateOptions::default())
}

fn evaluate(state: &AppState, model: &str, input: &Value, options: EvaluateOptions) -> Response {
    let known = state.engine.registry().get(model).is_some();
    match state.engine.evaluate(model, input, options) {
        evaluation @ Evaluation::Ok { .. } => {
            Json(ApiResponse::ok(evaluation.to_json())).into_response()
        }
        Evaluation::Err { error } => {
            let status = if known {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::NOT_FOUND
            };
            (status, Json(ApiResponse::<Value>::err(error))).into_response()
        }
    }
}

/// GET /api/v1/session - Current session statistics
pub async fn session(State(state): State<Arc<AppState>>) -> Json<ApiResponse<SessionAnalysis>> {
    Json(ApiResponse::ok(state.engine.session_summary()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResponse {
    pub session_id: String,
}

/// POST /api/v1/session/new - Start a new session
pub async fn new_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(NewSessionResponse {
        session_id: state.engine.start_new_session(),
    }))
}

/// Report request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub save_path: Option<String>,
    #[serde(default)]
    pub custom_analysis: Option<String>,
}

/// Report response
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub file_path: String,
}

/// POST /api/v1/report - Write a Markdown session report
pub async fn report(
    State(state): State<Arc<AppState>>,
    body: Option<Json<ReportRequest>>,
) -> Response {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let save_dir = req.save_path.map(PathBuf::from);
    match state
        .engine
        .generate_report(save_dir.as_deref(), req.custom_analysis.as_deref())
    {
        Ok(path) => Json(ApiResponse::ok(ReportResponse {
            file_path: path.display().to_string(),
        }))
        .into_response(),
        Err(e) => {
            warn!("Report generation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<ReportResponse>::err(e.to_string())),
            )
                .into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Bad Request", "message": message })),
    )
        .into_response()
}

/// POST /mcp - JSON-RPC over HTTP
///
/// `initialize` issues an `Mcp-Session-Id`; every other request must carry a
/// live one. Notifications are acknowledged with `202 Accepted`.
pub async fn mcp(State(state): State<Arc<AppState>>, headers: HeaderMap, body: String) -> Response {
    let message: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::parse_error(e))).into_response()
        }
    };

    let initializing = message.get("method").and_then(Value::as_str) == Some("initialize");
    let session_id = if initializing {
        state.mcp_sessions.issue()
    } else {
        match headers
            .get(MCP_SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            Some(id) if state.mcp_sessions.touch(id) => id.to_string(),
            Some(_) => return bad_request("Unknown or expired Mcp-Session-Id"),
            None => return bad_request("Missing Mcp-Session-Id header"),
        }
    };
    debug!(session = %session_id, "MCP over HTTP");

    let mut response = match state.mcp.handle_value(message) {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(MCP_SESSION_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ApiResponse Tests ====================

    #[test]
    fn test_api_response_ok_creates_success_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test data".to_string());

        assert!(response.success);
        assert_eq!(response.data, Some("test data".to_string()));
        assert!(response.error.is_none());
        // UUID format (8-4-4-4-12)
        assert_eq!(response.request_id.len(), 36);
    }

    #[test]
    fn test_api_response_err_creates_error_response() {
        let response: ApiResponse<Value> = ApiResponse::err("unknown model: x");

        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("unknown model: x"));
    }

    #[test]
    fn test_api_response_serializes_without_none_fields() {
        let response: ApiResponse<String> = ApiResponse::ok("data".to_string());
        let json = serde_json::to_string(&response).unwrap();

        assert!(!json.contains("\"error\""));
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"data\":\"data\""));
    }

    // ==================== Request Deserialization Tests ====================

    #[test]
    fn test_run_request_deserialize() {
        let json = r#"{"model": "bdm", "input": {"faceValue": 1000}, "sanitizeMode": "null", "format": "pct"}"#;
        let req: RunRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.model, "bdm");
        assert_eq!(req.input["faceValue"], 1000);
        assert_eq!(req.sanitize_mode, Some(SanitizeMode::Null));
        assert_eq!(req.format, OutputFormat::Pct);
    }

    #[test]
    fn test_run_request_defaults() {
        let req: RunRequest = serde_json::from_str(r#"{"model": "dda"}"#).unwrap();

        assert!(req.input.is_null());
        assert!(req.sanitize_mode.is_none());
        assert_eq!(req.format, OutputFormat::Raw);
    }

    #[test]
    fn test_report_request_deserialize() {
        let req: ReportRequest =
            serde_json::from_str(r#"{"savePath": "/tmp/r", "customAnalysis": "ok"}"#).unwrap();

        assert_eq!(req.save_path.as_deref(), Some("/tmp/r"));
        assert_eq!(req.custom_analysis.as_deref(), Some("ok"));
    }

    // ==================== Response Serialization Tests ====================

    #[test]
    fn test_health_response_serialize() {
        let response = HealthResponse {
            status: "ok".to_string(),
            models: 13,
            ts: "2025-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["models"], 13);
    }

    #[test]
    fn test_new_session_response_is_camel_case() {
        let json = serde_json::to_string(&NewSessionResponse {
            session_id: "session_1_abc".to_string(),
        })
        .unwrap();

        assert_eq!(json, r#"{"sessionId":"session_1_abc"}"#);
    }
}
