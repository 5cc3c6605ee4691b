//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod sync;

use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::{limit::ConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState) -> Router {
    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .propagate_x_request_id();

    // Each sync route admits one in-flight request; the limit is per route
    let sync_routes = Router::new()
        .route("/", post(sync::sync_table))
        .route("/schema", post(sync::sync_schema))
        .route("/properties", post(sync::update_properties))
        .route("/last-commit", post(sync::update_last_commit))
        .route("/last-synced", get(sync::last_synced))
        .layer(ConcurrencyLimitLayer::new(1));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/scope", get(sync::scope))
        .nest("/sync", sync_routes)
        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
