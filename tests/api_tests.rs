//! API integration tests
//!
//! The router is exercised in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use sebit_models::api::{build_router, AppState, MCP_SESSION_HEADER};
use sebit_models::core::{Engine, EngineConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    let engine = Arc::new(Engine::new(EngineConfig {
        journal_root: dir.path().join("journal"),
        report_dir: dir.path().join("reports"),
        ..EngineConfig::default()
    }));
    build_router(Arc::new(AppState::new(engine)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_mcp(body: Value, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(MCP_SESSION_HEADER, id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// INFO ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["models"], json!(13));
    assert!(body["ts"].as_str().is_some());
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let dir = TempDir::new().unwrap();
    let body = body_json(app(&dir).oneshot(get("/")).await.unwrap()).await;

    assert_eq!(body["success"], json!(true));
    let paths: Vec<&str> = body["data"]["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"/api/v1/run"));
    assert!(paths.contains(&"/mcp"));
}

#[tokio::test]
async fn test_version() {
    let dir = TempDir::new().unwrap();
    let body = body_json(app(&dir).oneshot(get("/version")).await.unwrap()).await;
    assert_eq!(body["data"]["version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(body["data"]["models"][0], json!("dda"));
}

#[tokio::test]
async fn test_list_models() {
    let dir = TempDir::new().unwrap();
    let body = body_json(app(&dir).oneshot(get("/api/v1/models")).await.unwrap()).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 13);
    assert_eq!(body["data"][4], json!({ "name": "bdm", "label": "Bond Effective Interest" }));
}

// ═══════════════════════════════════════════════════════════════════════════
// MODEL ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_run_model() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(post(
            "/api/v1/run",
            json!({
                "model": "bdm",
                "input": {
                    "carryingAmountStart": 980, "faceValue": 1000,
                    "couponRatePerPeriod": 0.025, "yieldRatePerPeriod": 0.03
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["model"], json!("bdm"));
    assert_eq!(body["data"]["output"]["isDiscountBond"], json!(true));
}

#[tokio::test]
async fn test_run_named_model_connector_style() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(post(
            "/api/v1/models/cprm",
            json!({ "baseCR": 0.5, "ddAdj": 0.024, "extraAdj": 0.05 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["output"]["finalConversionRate"], json!(0.38));
}

#[tokio::test]
async fn test_run_unknown_model_is_404() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(post("/api/v1/models/xyz", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().starts_with("unknown model: xyz"));
}

#[tokio::test]
async fn test_journal_validation_error_is_400() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(post("/api/v1/run", json!({ "model": "journal", "input": {} })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], json!("company is required."));
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSIONS AND REPORTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_session_and_new_session() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    app.clone()
        .oneshot(post("/api/v1/models/dda", json!({})))
        .await
        .unwrap();
    let body = body_json(app.clone().oneshot(get("/api/v1/session")).await.unwrap()).await;
    assert_eq!(body["data"]["totalExecutions"], json!(1));

    let body = body_json(
        app.clone()
            .oneshot(post("/api/v1/session/new", json!({})))
            .await
            .unwrap(),
    )
    .await;
    let new_id = body["data"]["sessionId"].as_str().unwrap().to_string();

    let body = body_json(app.oneshot(get("/api/v1/session")).await.unwrap()).await;
    assert_eq!(body["data"]["sessionId"], json!(new_id));
    assert_eq!(body["data"]["totalExecutions"], json!(0));
}

#[tokio::test]
async fn test_report_written_to_save_path() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let response = app(&dir)
        .oneshot(post(
            "/api/v1/report",
            json!({ "savePath": out.to_string_lossy(), "customAnalysis": "API run" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let path = body["data"]["filePath"].as_str().unwrap();
    assert!(path.contains("SEBIT-Report_"));
    assert!(std::path::Path::new(path).starts_with(&out));
}

// ═══════════════════════════════════════════════════════════════════════════
// MCP OVER HTTP
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_mcp_session_lifecycle() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let response = app
        .clone()
        .oneshot(post_mcp(
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = response
        .headers()
        .get(MCP_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert_eq!(body_json(response).await["result"]["protocolVersion"], json!("2024-11-05"));

    let response = app
        .clone()
        .oneshot(post_mcp(
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            Some(&session),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post_mcp(
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "run_model", "arguments": { "model": "dda" } }
            }),
            Some(&session),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["result"]["isError"], json!(false));
}

#[tokio::test]
async fn test_mcp_requires_session_header() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(post_mcp(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], json!("Bad Request"));
}

#[tokio::test]
async fn test_mcp_rejects_unknown_session() {
    let dir = TempDir::new().unwrap();
    let response = app(&dir)
        .oneshot(post_mcp(
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
            Some("not-a-session"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mcp_parse_error() {
    let dir = TempDir::new().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .body(Body::from("{oops"))
        .unwrap();
    let response = app(&dir).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], json!(-32700));
}
