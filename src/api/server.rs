//! SEBIT API Server implementation
//!
//! HTTP REST API server using Axum. Serves the model endpoints, session
//! reporting and the MCP JSON-RPC endpoint over one shared [`Engine`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers;
use super::mcp_sessions::{McpSessions, MCP_SESSION_HEADER};
use crate::core::Engine;
use crate::mcp::SebitMcpServer;

/// API Server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means any origin.
    pub cors_allow_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3333,
            cors_allow_origins: Vec::new(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub version: String,
    pub engine: Arc<Engine>,
    pub mcp: SebitMcpServer,
    pub mcp_sessions: McpSessions,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            mcp: SebitMcpServer::new(Arc::clone(&engine)),
            engine,
            mcp_sessions: McpSessions::default(),
        }
    }
}

/// CORS layer for the configured origins.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(MCP_SESSION_HEADER)])
}

/// All routes over `state`, without CORS or tracing layers.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        // Model endpoints
        .route("/api/v1/models", get(handlers::list_models))
        .route("/api/v1/models/:name", post(handlers::run_named))
        .route("/api/v1/run", post(handlers::run))
        // Sessions and reports
        .route("/api/v1/session", get(handlers::session))
        .route("/api/v1/session/new", post(handlers::new_session))
        .route("/api/v1/report", post(handlers::report))
        // MCP over HTTP
        .route("/mcp", post(handlers::mcp))
        .with_state(state)
}

/// Run the API server
pub async fn run_api_server(config: ApiConfig, engine: Arc<Engine>) -> anyhow::Result<()> {
    // A subscriber may already be installed by the caller
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sebit_server=info,sebit_models=info,tower_http=info".into()),
        )
        .try_init();

    let state = Arc::new(AppState::new(engine));
    let app = build_router(state)
        .layer(cors_layer(&config.cors_allow_origins))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("SEBIT API Server starting on http://{}", addr);
    info!("   Endpoints: /api/v1/models, /api/v1/run, /api/v1/models/:name, /api/v1/session, /api/v1/report");
    info!("   MCP: /mcp, Health: /health, Version: /version");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SEBIT API Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server...");
}
