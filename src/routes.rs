//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod api;

use crate::auth::{authenticate, processing_context};
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    set_header::SetRequestHeaderLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;
use uuid::Uuid;

pub use api::{EchoRequest, EchoResponse, WhoAmIResponse};

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Request ids are assigned here, never taken from the client, and must
    // exist before authentication and the request context run
    let layers = ServiceBuilder::new()
        .layer(SetRequestHeaderLayer::overriding(
            HeaderName::from_static(REQUEST_ID_HEADER),
            fresh_request_id,
        ))
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    Router::new()
        .route("/health", get(health_check))
        .route("/api/whoami", get(api::whoami))
        .route("/api/admin/ping", get(api::admin_ping))
        .route("/api/echo", post(api::echo))
        .layer(middleware::from_fn(processing_context))
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(layers)
        .with_state(state)
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Replace whatever `x-request-id` the client sent with a new UUID.
fn fresh_request_id(_: &Request) -> Option<HeaderValue> {
    HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
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
