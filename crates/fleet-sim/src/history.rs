//! Bounded per-agent telemetry history

use chrono::{DateTime, Utc};
use fleet_core::{Agent, AgentId, BatterySample, SensorSample};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Fixed-capacity ring buffer; pushing past capacity evicts the oldest item
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Battery and sensor series for every agent
#[derive(Debug, Clone)]
pub struct FleetHistory {
    capacity: usize,
    battery: HashMap<AgentId, HistoryBuffer<BatterySample>>,
    sensors: HashMap<AgentId, HistoryBuffer<SensorSample>>,
}

impl FleetHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            battery: HashMap::new(),
            sensors: HashMap::new(),
        }
    }

    /// Append one sample per series for the agent
    pub fn record(&mut self, agent: &Agent, at: DateTime<Utc>) {
        let capacity = self.capacity;

        self.battery
            .entry(agent.id.clone())
            .or_insert_with(|| HistoryBuffer::new(capacity))
            .push(BatterySample {
                timestamp: at,
                value: agent.battery_level,
            });

        self.sensors
            .entry(agent.id.clone())
            .or_insert_with(|| HistoryBuffer::new(capacity))
            .push(SensorSample {
                timestamp: at,
                temperature: agent.sensors.temperature,
                gas_level: agent.sensors.gas_level,
            });
    }

    pub fn record_all<'a>(&mut self, agents: impl IntoIterator<Item = &'a Agent>, at: DateTime<Utc>) {
        for agent in agents {
            self.record(agent, at);
        }
    }

    pub fn remove(&mut self, agent_id: &AgentId) {
        self.battery.remove(agent_id);
        self.sensors.remove(agent_id);
    }

    pub fn battery_for(&self, agent_id: &AgentId) -> Vec<BatterySample> {
        self.battery
            .get(agent_id)
            .map(HistoryBuffer::to_vec)
            .unwrap_or_default()
    }

    pub fn sensors_for(&self, agent_id: &AgentId) -> Vec<SensorSample> {
        self.sensors
            .get(agent_id)
            .map(HistoryBuffer::to_vec)
            .unwrap_or_default()
    }

    pub fn battery_snapshot(&self) -> BTreeMap<AgentId, Vec<BatterySample>> {
        self.battery
            .iter()
            .map(|(id, buf)| (id.clone(), buf.to_vec()))
            .collect()
    }

    pub fn sensor_snapshot(&self) -> BTreeMap<AgentId, Vec<SensorSample>> {
        self.sensors
            .iter()
            .map(|(id, buf)| (id.clone(), buf.to_vec()))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_evicts_oldest() {
        let mut buf = HistoryBuffer::new(3);
        for i in 0..5 {
            buf.push(i);
        }

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut buf = HistoryBuffer::new(0);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_fleet_history_capacity() {
        let mut history = FleetHistory::new(10);
        let mut agent = Agent::drone("drone-1", "One");

        for i in 0..25 {
            agent.set_battery(100.0 - i as f64);
            history.record(&agent, Utc::now());
        }

        let battery = history.battery_for(&agent.id);
        assert_eq!(battery.len(), 10);
        assert_eq!(battery.last().unwrap().value, 76.0);
        assert_eq!(history.sensors_for(&agent.id).len(), 10);
    }

    #[test]
    fn test_remove_and_snapshot() {
        let mut history = FleetHistory::new(5);
        let a = Agent::drone("drone-1", "One");
        let b = Agent::ground_bot("bot-1", "Bot", None);
        history.record_all([&a, &b], Utc::now());

        assert_eq!(history.battery_snapshot().len(), 2);

        history.remove(&a.id);
        assert!(history.battery_for(&a.id).is_empty());
        assert_eq!(history.sensor_snapshot().len(), 1);
    }
}
