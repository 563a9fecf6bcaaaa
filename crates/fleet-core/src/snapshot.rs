//! Read-only view of the whole fleet handed to dashboards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    Agent, AgentId, AgentStatus, Alert, BatterySample, CommandLog, GisFeature, HumanReport,
    SensorSample, StatusLog, WeatherSnapshot,
};

/// Complete fleet state at one instant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub drones: Vec<Agent>,
    pub ground_bots: Vec<Agent>,
    pub alerts: Vec<Alert>,
    pub command_logs: Vec<CommandLog>,
    pub status_logs: Vec<StatusLog>,
    pub human_reports: Vec<HumanReport>,
    pub weather: WeatherSnapshot,
    pub gis_features: Vec<GisFeature>,
    pub selected_agent_id: Option<AgentId>,
    pub battery_history: BTreeMap<AgentId, Vec<BatterySample>>,
    pub sensor_history: BTreeMap<AgentId, Vec<SensorSample>>,
    pub stats: FleetStats,
    pub timestamp: DateTime<Utc>,
}

impl FleetSnapshot {
    /// Drones followed by ground bots
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.drones.iter().chain(self.ground_bots.iter())
    }

    pub fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.agents().find(|a| &a.id == id)
    }
}

/// Summary counters for status panels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub agent_count: usize,
    pub operational_count: usize,
    pub unacknowledged_alerts: usize,
    /// Commands whose lifecycle timers are still running
    pub active_commands: usize,
    pub ticks: u64,
}

impl FleetStats {
    pub fn compute<'a>(
        agents: impl Iterator<Item = &'a Agent>,
        alerts: &[Alert],
        active_commands: usize,
        ticks: u64,
    ) -> Self {
        let (agent_count, operational_count) = agents.fold((0, 0), |(all, ok), agent| {
            (all + 1, ok + usize::from(agent.status == AgentStatus::Operational))
        });

        Self {
            agent_count,
            operational_count,
            unacknowledged_alerts: alerts.iter().filter(|a| !a.acknowledged).count(),
            active_commands,
            ticks,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
