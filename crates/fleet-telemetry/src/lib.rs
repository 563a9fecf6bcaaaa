//! # Fleet Telemetry - Metrics & Observability
//!
//! Prometheus metrics for the rescue fleet dashboard:
//! - Agent battery, sensors and status
//! - Simulation ticks, alerts and commands
//! - WebSocket connections
//! - API requests

use fleet_core::{Agent, AgentStatus, Event, EventPayload, EventType};
use prometheus::{
    GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metrics output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

pub type TelemetryResult<T> = Result<T, TelemetryError>;

const STATUSES: [AgentStatus; 5] = [
    AgentStatus::Operational,
    AgentStatus::LowBattery,
    AgentStatus::Critical,
    AgentStatus::Maintenance,
    AgentStatus::Offline,
];

/// Metrics collector for the fleet dashboard
pub struct MetricsCollector {
    registry: Registry,

    // Agent metrics
    agent_count: IntGauge,
    agent_status: IntGaugeVec,
    agent_battery: GaugeVec,
    agent_temperature: GaugeVec,
    agent_gas: GaugeVec,

    // Simulation metrics
    ticks_total: IntCounter,
    alerts_raised: IntCounterVec,
    alerts_acknowledged: IntCounter,
    commands_sent: IntCounterVec,
    commands_completed: IntCounterVec,
    notifications_total: IntCounterVec,

    // WebSocket metrics
    ws_connections: IntGauge,
    ws_messages_sent: IntCounter,
    ws_messages_received: IntCounter,

    // API metrics
    api_requests_total: IntCounterVec,
    api_request_duration: HistogramVec,
}

impl MetricsCollector {
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        // Agent metrics
        let agent_count = IntGauge::new("rescue_fleet_agents_total", "Agents in the fleet")?;
        registry.register(Box::new(agent_count.clone()))?;

        let agent_status = IntGaugeVec::new(
            Opts::new("rescue_fleet_agent_status", "1 for the agent's current status"),
            &["agent_id", "status"],
        )?;
        registry.register(Box::new(agent_status.clone()))?;

        let agent_battery = GaugeVec::new(
            Opts::new("rescue_fleet_agent_battery_percent", "Agent battery level"),
            &["agent_id"],
        )?;
        registry.register(Box::new(agent_battery.clone()))?;

        let agent_temperature = GaugeVec::new(
            Opts::new("rescue_fleet_agent_temperature_celsius", "Agent temperature reading"),
            &["agent_id"],
        )?;
        registry.register(Box::new(agent_temperature.clone()))?;

        let agent_gas = GaugeVec::new(
            Opts::new("rescue_fleet_agent_gas_ppm", "Agent gas concentration reading"),
            &["agent_id"],
        )?;
        registry.register(Box::new(agent_gas.clone()))?;

        // Simulation metrics
        let ticks_total =
            IntCounter::new("rescue_fleet_ticks_total", "Simulation ticks completed")?;
        registry.register(Box::new(ticks_total.clone()))?;

        let alerts_raised = IntCounterVec::new(
            Opts::new("rescue_fleet_alerts_raised_total", "Alerts raised"),
            &["type", "severity"],
        )?;
        registry.register(Box::new(alerts_raised.clone()))?;

        let alerts_acknowledged = IntCounter::new(
            "rescue_fleet_alerts_acknowledged_total",
            "Alerts acknowledged by an operator",
        )?;
        registry.register(Box::new(alerts_acknowledged.clone()))?;

        let commands_sent = IntCounterVec::new(
            Opts::new("rescue_fleet_commands_sent_total", "Commands dispatched"),
            &["command"],
        )?;
        registry.register(Box::new(commands_sent.clone()))?;

        let commands_completed = IntCounterVec::new(
            Opts::new("rescue_fleet_commands_completed_total", "Commands completed"),
            &["command"],
        )?;
        registry.register(Box::new(commands_completed.clone()))?;

        let notifications_total = IntCounterVec::new(
            Opts::new("rescue_fleet_notifications_total", "Operator notifications raised"),
            &["variant"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        // WebSocket metrics
        let ws_connections =
            IntGauge::new("rescue_fleet_ws_connections", "Active WebSocket connections")?;
        registry.register(Box::new(ws_connections.clone()))?;

        let ws_messages_sent = IntCounter::new(
            "rescue_fleet_ws_messages_sent_total",
            "Total WebSocket messages sent",
        )?;
        registry.register(Box::new(ws_messages_sent.clone()))?;

        let ws_messages_received = IntCounter::new(
            "rescue_fleet_ws_messages_received_total",
            "Total WebSocket messages received",
        )?;
        registry.register(Box::new(ws_messages_received.clone()))?;

        // API metrics
        let api_requests_total = IntCounterVec::new(
            Opts::new("rescue_fleet_api_requests_total", "API requests"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(api_requests_total.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "rescue_fleet_api_request_duration_seconds",
                "API request duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        info!("📊 Metrics collector initialized");

        Ok(Self {
            registry,
            agent_count,
            agent_status,
            agent_battery,
            agent_temperature,
            agent_gas,
            ticks_total,
            alerts_raised,
            alerts_acknowledged,
            commands_sent,
            commands_completed,
            notifications_total,
            ws_connections,
            ws_messages_sent,
            ws_messages_received,
            api_requests_total,
            api_request_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> TelemetryResult<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    // ========================================================================
    // AGENT METRICS
    // ========================================================================

    pub fn set_agent_count(&self, count: usize) {
        self.agent_count.set(count as i64);
    }

    /// Update battery, sensor and status gauges of one agent
    pub fn update_agent(&self, agent: &Agent) {
        let id = agent.id.as_str();

        self.agent_battery
            .with_label_values(&[id])
            .set(agent.battery_level);
        self.agent_temperature
            .with_label_values(&[id])
            .set(agent.sensors.temperature);
        self.agent_gas
            .with_label_values(&[id])
            .set(agent.sensors.gas_level);

        self.set_agent_status(id, agent.status);
    }

    /// One-hot status gauge: the current status reads 1, every other 0
    pub fn set_agent_status(&self, agent_id: &str, status: AgentStatus) {
        for candidate in STATUSES {
            let label = candidate.to_string();
            self.agent_status
                .with_label_values(&[agent_id, &label])
                .set(i64::from(candidate == status));
        }
    }

    /// Drop every per-agent series of a removed agent
    pub fn remove_agent(&self, agent_id: &str) {
        let _ = self.agent_battery.remove_label_values(&[agent_id]);
        let _ = self.agent_temperature.remove_label_values(&[agent_id]);
        let _ = self.agent_gas.remove_label_values(&[agent_id]);
        for status in STATUSES {
            let label = status.to_string();
            let _ = self.agent_status.remove_label_values(&[agent_id, &label]);
        }
    }

    // ========================================================================
    // EVENT METRICS
    // ========================================================================

    /// Fold one fleet event into the metrics
    pub fn observe_event(&self, event: &Event) {
        match (&event.event_type, &event.payload) {
            (EventType::FleetUpdated, EventPayload::Fleet(fleet)) => {
                self.ticks_total.inc();
                self.set_agent_count(fleet.drones.len() + fleet.ground_bots.len());
                for agent in fleet.drones.iter().chain(fleet.ground_bots.iter()) {
                    self.update_agent(agent);
                }
            }
            (EventType::AgentStatusChanged, EventPayload::AgentStatus(change)) => {
                self.set_agent_status(change.agent_id.as_str(), change.new_status);
            }
            (EventType::AgentRemoved, EventPayload::AgentRemoved(removed)) => {
                self.remove_agent(removed.agent_id.as_str());
            }
            (EventType::AlertRaised, EventPayload::Alert(raised)) => {
                let alert_type = raised.alert.alert_type.to_string();
                let severity = raised.alert.severity.to_string();
                self.alerts_raised
                    .with_label_values(&[&alert_type, &severity])
                    .inc();
            }
            (EventType::AlertAcknowledged, _) => self.alerts_acknowledged.inc(),
            (EventType::CommandSent, EventPayload::Command(sent)) => {
                self.commands_sent
                    .with_label_values(&[sent.command.command.label()])
                    .inc();
            }
            (EventType::CommandCompleted, EventPayload::Command(done)) => {
                self.commands_completed
                    .with_label_values(&[done.command.command.label()])
                    .inc();
            }
            (EventType::Notification, EventPayload::Notification(toast)) => {
                let variant = format!("{:?}", toast.variant).to_lowercase();
                self.notifications_total
                    .with_label_values(&[&variant])
                    .inc();
            }
            (event_type, _) => debug!("No metrics for {:?}", event_type),
        }
    }

    // ========================================================================
    // WEBSOCKET METRICS
    // ========================================================================

    pub fn set_ws_connections(&self, count: usize) {
        self.ws_connections.set(count as i64);
    }

    pub fn record_ws_sent(&self) {
        self.ws_messages_sent.inc();
    }

    pub fn record_ws_received(&self) {
        self.ws_messages_received.inc();
    }

    // ========================================================================
    // API METRICS
    // ========================================================================

    pub fn record_api_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        self.api_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.api_request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{AgentId, Alert, AlertSeverity, AlertType, CommandLog, FleetCommand};

    #[test]
    fn test_metrics_export() {
        let metrics = MetricsCollector::new().unwrap();

        metrics.set_agent_count(7);
        metrics.set_ws_connections(2);

        let export = metrics.export().unwrap();
        assert!(export.contains("rescue_fleet_agents_total 7"));
        assert!(export.contains("rescue_fleet_ws_connections 2"));
    }

    #[test]
    fn test_fleet_update_event() {
        let metrics = MetricsCollector::new().unwrap();
        let drone = Agent::drone("drone-1", "Rescue Drone 1").with_battery(64.0);
        let bot = Agent::ground_bot("bot-1", "Bot", None).with_status(AgentStatus::LowBattery);

        metrics.observe_event(&Event::fleet_updated(1, vec![drone], vec![bot]));

        let export = metrics.export().unwrap();
        assert!(export.contains("rescue_fleet_ticks_total 1"));
        assert!(export.contains("rescue_fleet_agents_total 2"));
        assert!(export.contains(r#"rescue_fleet_agent_battery_percent{agent_id="drone-1"} 64"#));
        assert!(export.contains(r#"rescue_fleet_agent_status{agent_id="bot-1",status="Low Battery"} 1"#));
        assert!(export.contains(r#"rescue_fleet_agent_status{agent_id="bot-1",status="Operational"} 0"#));
    }

    #[test]
    fn test_alert_and_command_events() {
        let metrics = MetricsCollector::new().unwrap();
        let alert = Alert::new(
            AgentId::new("drone-1"),
            AlertType::GasLeak,
            AlertSeverity::Critical,
            "gas",
        );
        let command = CommandLog::sent(AgentId::new("drone-1"), FleetCommand::ScanArea, None);

        metrics.observe_event(&Event::alert_raised(alert));
        metrics.observe_event(&Event::command(command));

        let export = metrics.export().unwrap();
        assert!(export.contains(
            r#"rescue_fleet_alerts_raised_total{severity="critical",type="Gas Leak"} 1"#
        ));
        assert!(export.contains(r#"rescue_fleet_commands_sent_total{command="Scan Area"} 1"#));
    }

    #[test]
    fn test_removed_agent_series_are_dropped() {
        let metrics = MetricsCollector::new().unwrap();
        metrics.update_agent(&Agent::drone("drone-9", "Nine"));

        metrics.observe_event(&Event::agent_removed(AgentId::new("drone-9")));

        assert!(!metrics.export().unwrap().contains("drone-9"));
    }
}
