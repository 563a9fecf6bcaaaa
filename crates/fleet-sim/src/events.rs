//! Event bus for fleet-wide event distribution

use fleet_core::Event;

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

const MAX_HISTORY: usize = 500;

/// Event bus for distributing fleet events to dashboards and metrics
#[derive(Clone)]
pub struct EventBus {
    /// Broadcast sender for events
    sender: broadcast::Sender<Event>,
    /// Most recent events, oldest first
    history: Arc<RwLock<VecDeque<Event>>>,
    /// Total events published
    event_count: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            history: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_HISTORY))),
            event_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: Event) {
        {
            let mut history = self.history.write();
            if history.len() == MAX_HISTORY {
                history.pop_front();
            }
            history.push_back(event.clone());
        }

        let total = self.event_count.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.sender.send(event);

        debug!("Event published, total: {}", total);
    }

    pub fn publish_batch(&self, events: Vec<Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Up to `count` most recent events, oldest first
    pub fn get_recent(&self, count: usize) -> Vec<Event> {
        let history = self.history.read();
        let start = history.len().saturating_sub(count);
        history.iter().skip(start).cloned().collect()
    }

    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Approximate number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
