//! API request handlers

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use fleet_core::{
    Agent, AgentId, Alert, AlertId, BatterySample, CommandLog, CommandLogId, Event, FleetCommand,
    FleetSnapshot, GisFeature, HumanReport, ReportId, ReportStatus, SensorSample, StatusLog,
    WeatherSnapshot,
};
use fleet_db::{Document, QueryConstraint};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub api: String,
    pub simulation: String,
    pub docstore: String,
    pub docstore_healthy: bool,
    pub websocket_clients: usize,
    pub agents: usize,
    pub ticks: u64,
    pub unacknowledged_alerts: usize,
    pub events_published: u64,
    pub event_subscribers: usize,
}

#[derive(Serialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
    pub total: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentHistoryResponse {
    pub agent_id: AgentId,
    pub battery: Vec<BatterySample>,
    pub sensors: Vec<SensorSample>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandLogId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub applied: bool,
    pub selected_agent_id: Option<AgentId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAckResponse {
    pub report_id: ReportId,
    pub status: ReportStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketInfoResponse {
    pub port: u16,
    pub connected_clients: usize,
}

// ============================================================================
// REQUEST TYPES
// ============================================================================

#[derive(Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub parameters: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub agent_id: Option<AgentId>,
}

#[derive(Deserialize)]
pub struct AgentListParams {
    /// `drone` or `groundBot`
    pub kind: Option<String>,
}

#[derive(Deserialize)]
pub struct AlertListParams {
    #[serde(default)]
    pub unacknowledged: bool,
}

#[derive(Deserialize)]
pub struct RecentEventsParams {
    #[serde(default = "default_recent_events")]
    pub count: usize,
}

fn default_recent_events() -> usize {
    50
}

#[derive(Deserialize)]
pub struct DocumentQueryRequest {
    #[serde(default)]
    pub constraints: Vec<QueryConstraint>,
}

// ============================================================================
// HEALTH & STATUS HANDLERS
// ============================================================================

pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Ready once the simulation runs and the document store answers
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let docs_ready = state.docs.health_check().await.unwrap_or(false);
    let ready = docs_ready && state.store.is_running();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(serde_json::json!({ "ready": ready })))
}

pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.snapshot().stats;
    let docstore_healthy = state.docs.health_check().await.unwrap_or(false);

    Json(StatusResponse {
        api: "running".into(),
        simulation: if state.store.is_running() { "running" } else { "stopped" }.into(),
        docstore: state.docs.backend().into(),
        docstore_healthy,
        websocket_clients: state.ws_client_count(),
        agents: stats.agent_count,
        ticks: stats.ticks,
        unacknowledged_alerts: stats.unacknowledged_alerts,
        events_published: state.store.event_bus().event_count(),
        event_subscribers: state.store.event_bus().subscriber_count(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.metrics.set_ws_connections(state.ws_client_count());
    let body = state.metrics.export()?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

pub async fn websocket_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(WebSocketInfoResponse {
        port: state.config.ws_port,
        connected_clients: state.ws_client_count(),
    })
}

// ============================================================================
// FLEET HANDLERS
// ============================================================================

/// Full snapshot for dashboard initialization
pub async fn get_full_state(State(state): State<AppState>) -> Json<FleetSnapshot> {
    Json(state.store.snapshot())
}

pub async fn list_agents(
    State(state): State<AppState>,
    Query(params): Query<AgentListParams>,
) -> ApiResult<Json<AgentListResponse>> {
    let snapshot = state.store.snapshot();

    let agents: Vec<Agent> = match params.kind.as_deref() {
        None => snapshot.agents().cloned().collect(),
        Some("drone") => snapshot.drones,
        Some("groundBot") => snapshot.ground_bots,
        Some(other) => return Err(ApiError::bad_request(format!("unknown agent kind '{}'", other))),
    };

    Ok(Json(AgentListResponse {
        total: agents.len(),
        agents,
    }))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Agent>> {
    let id = AgentId::new(id);
    state
        .store
        .agent(&id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("agent {}", id)))
}

pub async fn get_agent_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentHistoryResponse>> {
    let id = AgentId::new(id);
    if state.store.agent(&id).is_none() {
        return Err(ApiError::not_found(format!("agent {}", id)));
    }

    Ok(Json(AgentHistoryResponse {
        battery: state.store.battery_history(&id),
        sensors: state.store.sensor_history(&id),
        agent_id: id,
    }))
}

/// Dispatch a command. Commands the store drops are still accepted.
pub async fn send_agent_command(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommandRequest>,
) -> ApiResult<impl IntoResponse> {
    let command: FleetCommand = req.command.parse()?;
    let id = AgentId::new(id);

    let response = match state.store.send_command(&id, command, req.parameters) {
        Some(command_id) => {
            info!("Command {} accepted for {}", command, id);
            CommandResponse {
                status: "sent".into(),
                command_id: Some(command_id),
            }
        }
        None => {
            debug!("Command {} for {} ignored", command, id);
            CommandResponse {
                status: "ignored".into(),
                command_id: None,
            }
        }
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn remove_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = AgentId::new(id);
    if state.store.remove_agent(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("agent {}", id)))
    }
}

pub async fn put_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Json<SelectionResponse> {
    let applied = state.store.select_agent(req.agent_id);

    Json(SelectionResponse {
        applied,
        selected_agent_id: state.store.snapshot().selected_agent_id,
    })
}

pub async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertListParams>,
) -> Json<Vec<Alert>> {
    let mut alerts = state.store.snapshot().alerts;
    if params.unacknowledged {
        alerts.retain(|a| !a.acknowledged);
    }
    Json(alerts)
}

pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Alert>> {
    let id = AlertId::new(id);
    if !state.store.acknowledge_alert(&id) {
        return Err(ApiError::not_found(format!("alert {}", id)));
    }

    state
        .store
        .snapshot()
        .alerts
        .into_iter()
        .find(|a| a.id == id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("alert {}", id)))
}

pub async fn list_commands(State(state): State<AppState>) -> Json<Vec<CommandLog>> {
    Json(state.store.snapshot().command_logs)
}

pub async fn list_status_logs(State(state): State<AppState>) -> Json<Vec<StatusLog>> {
    Json(state.store.snapshot().status_logs)
}

pub async fn list_reports(State(state): State<AppState>) -> Json<Vec<HumanReport>> {
    Json(state.store.snapshot().human_reports)
}

pub async fn acknowledge_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReportAckResponse>> {
    let id = ReportId::new(id);
    let status = state
        .store
        .acknowledge_human_report(&id)
        .ok_or_else(|| ApiError::not_found(format!("report {}", id)))?;

    Ok(Json(ReportAckResponse {
        report_id: id,
        status,
    }))
}

pub async fn get_weather(State(state): State<AppState>) -> Json<WeatherSnapshot> {
    Json(state.store.snapshot().weather)
}

pub async fn list_gis_features(State(state): State<AppState>) -> Json<Vec<GisFeature>> {
    Json(state.store.snapshot().gis_features)
}

/// Latest published events, oldest first, for dashboards catching up
pub async fn recent_events(
    State(state): State<AppState>,
    Query(params): Query<RecentEventsParams>,
) -> Json<Vec<Event>> {
    Json(state.store.event_bus().get_recent(params.count))
}

pub async fn reset_simulation(State(state): State<AppState>) -> impl IntoResponse {
    info!("Simulation reset requested");
    state.store.reset();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "reset",
            "agents": state.store.snapshot().stats.agent_count,
        })),
    )
}

// ============================================================================
// DOCUMENT HANDLERS
// ============================================================================

pub async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> ApiResult<Json<Vec<Document>>> {
    let documents = state.docs.get_collection(&collection).await.map_err(|e| {
        error!("Error getting collection {}: {}", collection, e);
        e
    })?;
    Ok(Json(documents))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Json<Document>> {
    let document = state.docs.get_document(&collection, &id).await.map_err(|e| {
        error!("Error getting document {}/{}: {}", collection, id, e);
        e
    })?;

    document
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("document {}/{}", collection, id)))
}

pub async fn query_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(req): Json<DocumentQueryRequest>,
) -> ApiResult<Json<Vec<Document>>> {
    let documents = state
        .docs
        .get_collection_with_query(&collection, &req.constraints)
        .await
        .map_err(|e| {
            error!("Error querying collection {}: {}", collection, e);
            e
        })?;
    Ok(Json(documents))
}

// ============================================================================
// TESTS
// ============================================================================
