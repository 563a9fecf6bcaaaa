//! API route definitions

use crate::handlers;
use crate::state::AppState;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Dashboard origin allowed when CORS is not permissive
const DASHBOARD_ORIGIN: &str = "http://localhost:8080";

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin([axum::http::HeaderValue::from_static(DASHBOARD_ORIGIN)])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health & Status
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/status", get(handlers::system_status))
        .route("/metrics", get(handlers::metrics))
        // Fleet
        .route("/api/v1/state", get(handlers::get_full_state))
        .route("/api/v1/agents", get(handlers::list_agents))
        .route(
            "/api/v1/agents/{id}",
            get(handlers::get_agent).delete(handlers::remove_agent),
        )
        .route("/api/v1/agents/{id}/history", get(handlers::get_agent_history))
        .route("/api/v1/agents/{id}/command", post(handlers::send_agent_command))
        .route("/api/v1/selection", put(handlers::put_selection))
        // Alerts, logs and reports
        .route("/api/v1/alerts", get(handlers::list_alerts))
        .route("/api/v1/alerts/{id}/acknowledge", post(handlers::acknowledge_alert))
        .route("/api/v1/commands", get(handlers::list_commands))
        .route("/api/v1/status-logs", get(handlers::list_status_logs))
        .route("/api/v1/reports", get(handlers::list_reports))
        .route("/api/v1/reports/{id}/acknowledge", post(handlers::acknowledge_report))
        // Environment
        .route("/api/v1/weather", get(handlers::get_weather))
        .route("/api/v1/gis", get(handlers::list_gis_features))
        .route("/api/v1/simulation/reset", post(handlers::reset_simulation))
        .route("/api/v1/events", get(handlers::recent_events))
        // Documents
        .route("/api/v1/documents/{collection}", get(handlers::list_documents))
        .route("/api/v1/documents/{collection}/query", post(handlers::query_documents))
        .route("/api/v1/documents/{collection}/{id}", get(handlers::get_document))
        .route("/api/v1/ws/info", get(handlers::websocket_info))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Count and time every routed request by its route template
async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    state.metrics.record_api_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
