//! Event types for the rescue fleet dashboard
//!
//! Events are published by the fleet store after every state change and are
//! streamed to dashboards over WebSocket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Agent, AgentId, AgentStatus, Alert, AlertId, CommandLog, CommandStatus, FleetCommand,
    FleetSnapshot, HumanReport, ReportId, StatusLog, WeatherSnapshot,
};

/// Event envelope for all fleet events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(event_type: EventType, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            payload,
        }
    }

    pub fn fleet_updated(tick: u64, drones: Vec<Agent>, ground_bots: Vec<Agent>) -> Self {
        Self::new(
            EventType::FleetUpdated,
            EventPayload::Fleet(FleetEvent {
                tick,
                drones,
                ground_bots,
            }),
        )
    }

    pub fn agent_status_changed(
        agent_id: AgentId,
        old_status: AgentStatus,
        new_status: AgentStatus,
    ) -> Self {
        Self::new(
            EventType::AgentStatusChanged,
            EventPayload::AgentStatus(AgentStatusEvent {
                agent_id,
                old_status,
                new_status,
            }),
        )
    }

    pub fn alert_raised(alert: Alert) -> Self {
        Self::new(
            EventType::AlertRaised,
            EventPayload::Alert(AlertEvent { alert }),
        )
    }

    pub fn alert_acknowledged(alert: Alert) -> Self {
        Self::new(
            EventType::AlertAcknowledged,
            EventPayload::Alert(AlertEvent { alert }),
        )
    }

    pub fn command(command: CommandLog) -> Self {
        let event_type = match command.status {
            CommandStatus::Pending | CommandStatus::Sent => EventType::CommandSent,
            CommandStatus::Acknowledged => EventType::CommandAcknowledged,
            CommandStatus::Completed => EventType::CommandCompleted,
            CommandStatus::Failed => EventType::CommandFailed,
        };
        Self::new(event_type, EventPayload::Command(CommandEvent { command }))
    }

    pub fn status_logged(log: StatusLog) -> Self {
        Self::new(
            EventType::StatusLogged,
            EventPayload::StatusLog(StatusLogEvent { log }),
        )
    }

    pub fn report_updated(report: HumanReport) -> Self {
        Self::new(
            EventType::HumanReportUpdated,
            EventPayload::HumanReport(HumanReportEvent { report }),
        )
    }

    pub fn weather_updated(weather: WeatherSnapshot) -> Self {
        Self::new(
            EventType::WeatherUpdated,
            EventPayload::Weather(WeatherEvent { weather }),
        )
    }

    pub fn selection_changed(agent_id: Option<AgentId>) -> Self {
        Self::new(
            EventType::SelectionChanged,
            EventPayload::Selection(SelectionEvent { agent_id }),
        )
    }

    pub fn agent_removed(agent_id: AgentId) -> Self {
        Self::new(
            EventType::AgentRemoved,
            EventPayload::AgentRemoved(AgentRemovedEvent { agent_id }),
        )
    }

    pub fn simulation_reset(agent_count: usize) -> Self {
        Self::new(
            EventType::SimulationReset,
            EventPayload::System(SystemEvent {
                component: "fleet-store".into(),
                status: "reset".into(),
                message: Some(format!("Fleet regenerated with {} agents", agent_count)),
            }),
        )
    }

    pub fn notification(notification: Notification) -> Self {
        Self::new(
            EventType::Notification,
            EventPayload::Notification(notification),
        )
    }
}

/// Type of event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Fleet events
    FleetUpdated,
    AgentStatusChanged,
    AgentRemoved,
    SelectionChanged,

    // Alert events
    AlertRaised,
    AlertAcknowledged,

    // Command events
    CommandSent,
    CommandAcknowledged,
    CommandCompleted,
    CommandFailed,

    // Narrative & environment
    StatusLogged,
    HumanReportUpdated,
    WeatherUpdated,

    // Operator-facing
    Notification,
    SimulationReset,
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventPayload {
    Fleet(FleetEvent),
    AgentStatus(AgentStatusEvent),
    AgentRemoved(AgentRemovedEvent),
    Selection(SelectionEvent),
    Alert(AlertEvent),
    Command(CommandEvent),
    StatusLog(StatusLogEvent),
    HumanReport(HumanReportEvent),
    Weather(WeatherEvent),
    Notification(Notification),
    System(SystemEvent),
}

/// Positions and telemetry after a tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetEvent {
    pub tick: u64,
    pub drones: Vec<Agent>,
    pub ground_bots: Vec<Agent>,
}

/// Agent status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusEvent {
    pub agent_id: AgentId,
    pub old_status: AgentStatus,
    pub new_status: AgentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRemovedEvent {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert: Alert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub command: CommandLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLogEvent {
    pub log: StatusLog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanReportEvent {
    pub report: HumanReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherEvent {
    pub weather: WeatherSnapshot,
}

/// Component lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub component: String,
    pub status: String,
    pub message: Option<String>,
}

/// Visual style of an operator notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// Transient operator-facing notification (toast)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
    /// Dashboards should play an audible cue
    pub audible: bool,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
            audible: false,
        }
    }

    pub fn destructive(mut self) -> Self {
        self.variant = NotificationVariant::Destructive;
        self
    }

    pub fn audible(mut self) -> Self {
        self.audible = true;
        self
    }
}

// ============================================================================
// WEBSOCKET MESSAGE TYPES
// ============================================================================

/// Message sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Full state on connection or on request
    InitialState(Box<FleetSnapshot>),
    /// Event update
    Event(Event),
    /// Error message
    Error { code: String, message: String },
    /// Heartbeat/ping
    Ping { timestamp: i64 },
}

/// Message sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Request current state
    RequestState,
    /// Operator intent forwarded to the fleet store
    Intent(OperatorIntent),
    /// Heartbeat/pong
    Pong { timestamp: i64 },
}

/// Mutation a dashboard asks the fleet store to perform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum OperatorIntent {
    SelectAgent {
        #[serde(rename = "agentId")]
        agent_id: Option<AgentId>,
    },
    SendCommand {
        #[serde(rename = "agentId")]
        agent_id: AgentId,
        command: FleetCommand,
        #[serde(default)]
        parameters: Option<String>,
    },
    AcknowledgeAlert {
        #[serde(rename = "alertId")]
        alert_id: AlertId,
    },
    AcknowledgeReport {
        #[serde(rename = "reportId")]
        report_id: ReportId,
    },
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::agent_status_changed(
            AgentId::new("drone-1"),
            AgentStatus::Operational,
            AgentStatus::LowBattery,
        );

        assert_eq!(event.event_type, EventType::AgentStatusChanged);
    }

    #[test]
    fn test_command_event_type_follows_status() {
        let mut log = CommandLog::sent(AgentId::new("drone-1"), FleetCommand::ReturnToBase, None);
        assert_eq!(Event::command(log.clone()).event_type, EventType::CommandSent);

        log.advance(CommandStatus::Acknowledged).unwrap();
        assert_eq!(
            Event::command(log.clone()).event_type,
            EventType::CommandAcknowledged
        );

        log.advance(CommandStatus::Completed).unwrap();
        assert_eq!(Event::command(log).event_type, EventType::CommandCompleted);
    }

    #[test]
    fn test_client_intent_parsing() {
        let json = r#"{"type":"Intent","payload":{"action":"sendCommand","agentId":"drone-1","command":"Scan Area","parameters":"Sector A1"}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        match msg {
            ClientMessage::Intent(OperatorIntent::SendCommand {
                agent_id,
                command,
                parameters,
            }) => {
                assert_eq!(agent_id.as_str(), "drone-1");
                assert_eq!(command, FleetCommand::ScanArea);
                assert_eq!(parameters.as_deref(), Some("Sector A1"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Ping { timestamp: 12345 };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("Ping"));

        let toast = Event::notification(Notification::new("Command Sent", "x").destructive());
        let json = serde_json::to_string(&ServerMessage::Event(toast)).unwrap();
        assert!(json.contains("destructive"));
    }
}
