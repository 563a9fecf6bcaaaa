//! WebSocket connection hub
//!
//! Tracks connected dashboards, fans fleet events out to them, and routes
//! operator intents back to whoever registered an intent handler.

use fleet_core::{Event, FleetSnapshot, OperatorIntent};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Broadcast channel capacity
const BROADCAST_CAPACITY: usize = 1024;

type IntentHandler = Box<dyn Fn(OperatorIntent) -> bool + Send + Sync>;
type StateProvider = Box<dyn Fn() -> FleetSnapshot + Send + Sync>;

/// WebSocket connection hub
pub struct WebSocketHub {
    broadcast_tx: broadcast::Sender<Event>,
    clients: DashMap<Uuid, ClientState>,
    message_count: AtomicUsize,
    intent_handler: RwLock<Option<IntentHandler>>,
    state_provider: RwLock<Option<StateProvider>>,
}

#[derive(Debug, Clone)]
pub struct ClientState {
    pub connected_at: DateTime<Utc>,
    pub messages_received: usize,
}

impl WebSocketHub {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            broadcast_tx,
            clients: DashMap::new(),
            message_count: AtomicUsize::new(0),
            intent_handler: RwLock::new(None),
            state_provider: RwLock::new(None),
        }
    }

    /// Register a new client and return its event receiver
    pub fn register_client(&self, client_id: Uuid) -> broadcast::Receiver<Event> {
        self.clients.insert(
            client_id,
            ClientState {
                connected_at: Utc::now(),
                messages_received: 0,
            },
        );
        info!("Client {} registered ({} total)", client_id, self.clients.len());

        self.broadcast_tx.subscribe()
    }

    pub fn unregister_client(&self, client_id: Uuid) {
        self.clients.remove(&client_id);
        info!("Client {} unregistered ({} remaining)", client_id, self.clients.len());
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_client_connected(&self, client_id: Uuid) -> bool {
        self.clients.contains_key(&client_id)
    }

    pub fn client(&self, client_id: Uuid) -> Option<ClientState> {
        self.clients.get(&client_id).map(|c| c.clone())
    }

    pub(crate) fn record_received(&self, client_id: Uuid) {
        if let Some(mut client) = self.clients.get_mut(&client_id) {
            client.messages_received += 1;
        }
    }

    /// Broadcast an event to all clients. Having none is not an error.
    pub fn broadcast(&self, event: Event) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        let _ = self.broadcast_tx.send(event);
    }

    /// Total events broadcast
    pub fn message_count(&self) -> usize {
        self.message_count.load(Ordering::Relaxed)
    }

    /// Install the callback that applies operator intents.
    /// It returns false when the intent was ignored.
    pub fn set_intent_handler<F>(&self, handler: F)
    where
        F: Fn(OperatorIntent) -> bool + Send + Sync + 'static,
    {
        *self.intent_handler.write() = Some(Box::new(handler));
    }

    /// Install the source of full-state snapshots sent to clients
    pub fn set_state_provider<F>(&self, provider: F)
    where
        F: Fn() -> FleetSnapshot + Send + Sync + 'static,
    {
        *self.state_provider.write() = Some(Box::new(provider));
    }

    pub fn handle_intent(&self, intent: OperatorIntent) -> bool {
        match self.intent_handler.read().as_ref() {
            Some(handler) => {
                debug!("Applying intent {:?}", intent);
                handler(intent)
            }
            None => {
                warn!("No intent handler registered");
                false
            }
        }
    }

    pub fn snapshot(&self) -> Option<FleetSnapshot> {
        self.state_provider.read().as_ref().map(|provider| provider())
    }
}

impl Default for WebSocketHub {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{AgentId, AgentStatus};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_client_registration() {
        let hub = WebSocketHub::new();
        let id = Uuid::new_v4();

        let _rx = hub.register_client(id);
        assert_eq!(hub.client_count(), 1);
        assert!(hub.is_client_connected(id));

        hub.record_received(id);
        assert_eq!(hub.client(id).unwrap().messages_received, 1);

        hub.unregister_client(id);
        assert_eq!(hub.client_count(), 0);
        assert!(!hub.is_client_connected(id));
    }

    #[test]
    fn test_broadcast_reaches_clients() {
        let hub = WebSocketHub::new();
        let mut rx = hub.register_client(Uuid::new_v4());

        hub.broadcast(Event::agent_status_changed(
            AgentId::new("drone-1"),
            AgentStatus::Operational,
            AgentStatus::Critical,
        ));

        assert!(rx.try_recv().is_ok());
        assert_eq!(hub.message_count(), 1);
    }

    #[test]
    fn test_intent_routing() {
        let hub = WebSocketHub::new();
        let intent = OperatorIntent::SelectAgent {
            agent_id: Some(AgentId::new("drone-1")),
        };
        assert!(!hub.handle_intent(intent.clone()));

        let seen = Arc::new(AtomicBool::new(false));
        let flag = seen.clone();
        hub.set_intent_handler(move |_| {
            flag.store(true, Ordering::SeqCst);
            true
        });

        assert!(hub.handle_intent(intent));
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn test_state_provider() {
        let hub = WebSocketHub::new();
        assert!(hub.snapshot().is_none());

        hub.set_state_provider(FleetSnapshot::default);
        assert!(hub.snapshot().unwrap().drones.is_empty());
    }
}
