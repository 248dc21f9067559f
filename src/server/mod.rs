//! HTTP server exposing instances, PRDs, and skills over REST
//!
//! Routes are grouped per domain under `routes/`. Every handler shares
//! the same `AppState` and maps `StoreError` to a response through
//! `ApiError`, so the error body shape is uniform across the API.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use routes::{instance_routes, prd_routes, skill_routes, transfer_routes};

/// Version information for the server
#[derive(serde::Serialize)]
struct VersionInfo {
    name: String,
    version: String,
}

/// Build the REST router with all routes attached.
///
/// Split out from `run_server` so tests can drive the router directly
/// with `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route(
            "/instances",
            get(instance_routes::list_instances).post(instance_routes::register_instance),
        )
        .route("/instances/:id", delete(instance_routes::remove_instance))
        .route(
            "/instances/:id/prds",
            get(prd_routes::list_prds)
                .post(prd_routes::create_prd)
                .patch(prd_routes::update_prd),
        )
        .route(
            "/instances/:id/prds/:filename/content",
            get(prd_routes::get_prd_content).put(prd_routes::put_prd_content),
        )
        .route(
            "/instances/:id/skills",
            get(skill_routes::list_skills).post(skill_routes::create_skill),
        )
        .route(
            "/instances/:id/skills/:filename",
            put(skill_routes::update_skill).delete(skill_routes::delete_skill),
        )
        .route("/skills/import", post(transfer_routes::import_skills))
        .route("/skills/export", post(transfer_routes::export_skills))
        .with_state(state)
}

/// Run the HTTP server until shutdown is requested
pub async fn run_server(
    port: u16,
    bind: &str,
    state: AppState,
    cors_origins: Option<Vec<String>>,
) -> Result<(), String> {
    // Build CORS layer
    // Must be the outermost layer so preflight OPTIONS requests are
    // answered before they reach any handler
    let cors = match &cors_origins {
        Some(origins) if !origins.is_empty() => {
            // Restricted CORS: only allow specified origins
            let allowed_origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods(Any)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        }
        _ => {
            // Permissive CORS: allow any origin (default for development)
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
        }
    };

    let shutdown_state = state.shutdown.clone();
    let app = build_router(state).layer(cors);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let cors_display = match &cors_origins {
        Some(origins) if !origins.is_empty() => origins.join(", "),
        _ => "*".to_string(),
    };

    println!("Forgeboard server listening on http://{}", addr);
    println!("  CORS origins: {}", cors_display);
    println!("  Health check: http://{}/health", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    // Create shutdown signal that waits for the shutdown state flag
    let shutdown_signal = async move {
        loop {
            if shutdown_state.is_shutdown_requested() {
                log::info!("Shutdown signal received, stopping server...");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Health check endpoint
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Version endpoint - returns package name and version
async fn version_handler() -> Json<VersionInfo> {
    Json(VersionInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
