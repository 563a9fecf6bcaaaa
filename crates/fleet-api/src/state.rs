//! Application state management

use crate::config::{ApiConfig, DocstoreBackend};
use fleet_core::OperatorIntent;
use fleet_db::{DbResult, Document, DocumentStore, MemoryDocumentStore, ScyllaDocumentStore};
use fleet_sim::{FleetStore, TerminalBell, demo};
use fleet_telemetry::MetricsCollector;
use fleet_websocket::WebSocketHub;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Collection holding field reports from rescue teams
pub const REPORTS_COLLECTION: &str = "humanReports";
/// Collection holding map overlays
pub const GIS_COLLECTION: &str = "gisFeatures";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    /// Canonical fleet state and simulation
    pub store: FleetStore,
    /// Document collections served under `/api/v1/documents`
    pub docs: Arc<dyn DocumentStore>,
    /// WebSocket hub for real-time updates
    pub ws_hub: Arc<WebSocketHub>,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Create the store, open the document store and wire the hub
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let store = FleetStore::new(config.to_store_config(), Box::new(TerminalBell));
        let docs = open_document_store(&config).await;

        if config.seed_demo_data {
            seed_documents(docs.as_ref()).await?;
        }

        Self::from_parts(config, store, docs)
    }

    /// Assemble state around an existing store and document backend
    pub fn from_parts(
        config: ApiConfig,
        store: FleetStore,
        docs: Arc<dyn DocumentStore>,
    ) -> anyhow::Result<Self> {
        let metrics = Arc::new(MetricsCollector::new()?);
        let ws_hub = Arc::new(WebSocketHub::new());

        let provider = store.clone();
        ws_hub.set_state_provider(move || provider.snapshot());

        let target = store.clone();
        let counter = metrics.clone();
        ws_hub.set_intent_handler(move |intent| {
            counter.record_ws_received();
            apply_intent(&target, intent)
        });

        let snapshot = store.snapshot();
        metrics.set_agent_count(snapshot.stats.agent_count);
        for agent in snapshot.agents() {
            metrics.update_agent(agent);
        }

        info!("WebSocket hub initialized");

        Ok(Self {
            config,
            store,
            docs,
            ws_hub,
            metrics,
        })
    }

    /// Forward store events to metrics and WebSocket clients until the
    /// store's event channel closes
    pub fn spawn_event_pump(&self) -> JoinHandle<()> {
        let mut events = self.store.subscribe();
        let hub = self.ws_hub.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        metrics.observe_event(&event);
                        metrics.set_ws_connections(hub.client_count());
                        if hub.client_count() > 0 {
                            metrics.record_ws_sent();
                        }
                        hub.broadcast(event);
                    }
                    Err(RecvError::Lagged(n)) => warn!("Event pump lagged by {} events", n),
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Event pump exited");
        })
    }

    pub fn ws_client_count(&self) -> usize {
        self.ws_hub.client_count()
    }
}

/// Apply a dashboard intent to the store. False when it was ignored.
pub fn apply_intent(store: &FleetStore, intent: OperatorIntent) -> bool {
    match intent {
        OperatorIntent::SelectAgent { agent_id } => store.select_agent(agent_id),
        OperatorIntent::SendCommand {
            agent_id,
            command,
            parameters,
        } => store.send_command(&agent_id, command, parameters).is_some(),
        OperatorIntent::AcknowledgeAlert { alert_id } => store.acknowledge_alert(&alert_id),
        OperatorIntent::AcknowledgeReport { report_id } => {
            store.acknowledge_human_report(&report_id).is_some()
        }
    }
}

async fn open_document_store(config: &ApiConfig) -> Arc<dyn DocumentStore> {
    match config.docstore_backend {
        DocstoreBackend::Memory => {
            info!("Using in-memory document store");
            Arc::new(MemoryDocumentStore::new())
        }
        DocstoreBackend::Scylla => match ScyllaDocumentStore::connect(config.db_config()).await {
            Ok(store) => {
                info!("Database connected");
                Arc::new(store)
            }
            Err(e) => {
                warn!("Database connection failed, using in-memory documents: {}", e);
                Arc::new(MemoryDocumentStore::new())
            }
        },
    }
}

/// Write the demo field reports and map overlays into their collections
pub async fn seed_documents(docs: &dyn DocumentStore) -> DbResult<()> {
    let reports = demo::human_reports();
    for report in &reports {
        docs.put_document(REPORTS_COLLECTION, to_document(report.id.as_str(), report)?)
            .await?;
    }

    let features = demo::gis_features();
    for (index, feature) in features.iter().enumerate() {
        let id = format!("gis-{}", index + 1);
        docs.put_document(GIS_COLLECTION, to_document(&id, feature)?)
            .await?;
    }

    info!(
        "Seeded {} reports and {} GIS features into the {} document store",
        reports.len(),
        features.len(),
        docs.backend()
    );
    Ok(())
}

fn to_document(id: &str, value: &impl Serialize) -> DbResult<Document> {
    let mut value = serde_json::to_value(value)?;
    if let Some(body) = value.as_object_mut() {
        body.remove("id");
    }
    Document::from_value(id, value)
}

/// Store whose alert sound does nothing, for tests
#[cfg(test)]
pub(crate) fn test_state(seed_demo_data: bool) -> AppState {
    let config = ApiConfig {
        sim_seed: Some(7),
        seed_demo_data,
        ..ApiConfig::default()
    };
    let sound: Box<dyn fleet_sim::AlertSound> = Box::new(fleet_sim::Silent);
    let store = FleetStore::new(config.to_store_config(), sound);
    AppState::from_parts(config, store, Arc::new(MemoryDocumentStore::new()))
        .expect("metrics registry")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{AgentId, EventType, FleetCommand};

    #[tokio::test]
    async fn test_seed_documents() {
        let docs = MemoryDocumentStore::new();
        seed_documents(&docs).await.unwrap();

        let reports = docs.get_collection(REPORTS_COLLECTION).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|d| !d.data.contains_key("id")));
        assert!(reports[0].data.contains_key("reporter"));

        let gis = docs.get_document(GIS_COLLECTION, "gis-1").await.unwrap();
        assert!(gis.is_some());
    }

    #[tokio::test]
    async fn test_intents_reach_store() {
        let state = test_state(true);

        assert!(state.ws_hub.handle_intent(OperatorIntent::SelectAgent {
            agent_id: Some(AgentId::new("drone-1")),
        }));
        assert_eq!(
            state.store.snapshot().selected_agent_id,
            Some(AgentId::new("drone-1"))
        );

        assert!(!state.ws_hub.handle_intent(OperatorIntent::SendCommand {
            agent_id: AgentId::new("drone-1"),
            command: FleetCommand::ScanArea,
            parameters: None,
        }));
        assert!(state.ws_hub.handle_intent(OperatorIntent::SendCommand {
            agent_id: AgentId::new("bot-1"),
            command: FleetCommand::StartMission,
            parameters: None,
        }));
    }

    #[tokio::test]
    async fn test_ignored_command_intent_leaves_no_trace() {
        let state = test_state(true);
        let before = state.store.snapshot().command_logs.len();

        assert!(!state.ws_hub.handle_intent(OperatorIntent::SendCommand {
            agent_id: AgentId::new("drone-99"),
            command: FleetCommand::ReturnToBase,
            parameters: None,
        }));

        let snapshot = state.store.snapshot();
        assert_eq!(snapshot.command_logs.len(), before);
        assert_eq!(snapshot.stats.active_commands, 0);
    }

    #[tokio::test]
    async fn test_event_pump_forwards_to_hub() {
        let state = test_state(false);
        let mut client = state.ws_hub.register_client(uuid::Uuid::new_v4());
        let pump = state.spawn_event_pump();

        state.store.tick();

        let event = client.recv().await.unwrap();
        assert_eq!(event.event_type, EventType::FleetUpdated);
        assert!(state.metrics.export().unwrap().contains("rescue_fleet_ticks_total 1"));

        pump.abort();
    }
}
