//! # Fleet Core
//!
//! Domain model for the rescue fleet dashboard: agents (drones and ground
//! bots), command logs, alerts, status logs, human reports, weather and map
//! overlays. Every other crate in the workspace shares these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub mod error;
pub mod events;
pub mod geo;
pub mod snapshot;

pub use error::{CoreError, CoreResult};
pub use events::*;
pub use geo::*;
pub use snapshot::*;

// ============================================================================
// IDENTIFIERS
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Unique, stable identifier of a drone or ground bot
    AgentId,
    "agent"
);
string_id!(
    /// Identifier of an issued command
    CommandLogId,
    "cmd"
);
string_id!(
    /// Identifier of a derived alert
    AlertId,
    "alert"
);
string_id!(StatusLogId, "log");
string_id!(ReportId, "report");

// ============================================================================
// AGENT MODELS
// ============================================================================

/// Operational status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    Operational,
    #[serde(rename = "Low Battery")]
    LowBattery,
    Critical,
    Maintenance,
    Offline,
}

impl AgentStatus {
    /// Agents in these states move and drain on a tick; all others are frozen
    pub fn is_mobile(&self) -> bool {
        matches!(self, AgentStatus::Operational | AgentStatus::LowBattery)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Operational => write!(f, "Operational"),
            AgentStatus::LowBattery => write!(f, "Low Battery"),
            AgentStatus::Critical => write!(f, "Critical"),
            AgentStatus::Maintenance => write!(f, "Maintenance"),
            AgentStatus::Offline => write!(f, "Offline"),
        }
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Operational
    }
}

/// Kind of agent, carried explicitly instead of inferred from the id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AgentKind {
    /// Aerial drone
    Drone,
    /// Ground robot, optionally working on a task
    GroundBot {
        #[serde(rename = "assignedTask", default)]
        assigned_task: Option<String>,
    },
}

impl AgentKind {
    pub fn agent_type(&self) -> AgentType {
        match self {
            AgentKind::Drone => AgentType::Drone,
            AgentKind::GroundBot { .. } => AgentType::GroundBot,
        }
    }
}

/// Source tag carried on status logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentType {
    Drone,
    GroundBot,
    System,
}

/// Environmental sensor readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReadings {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Gas concentration in ppm
    pub gas_level: f64,
    /// Relative humidity in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

impl SensorReadings {
    pub fn new(temperature: f64, gas_level: f64, humidity: Option<f64>) -> Self {
        Self {
            temperature,
            gas_level,
            humidity,
        }
    }
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self::new(20.0, 0.0, None)
    }
}

/// A drone or ground bot tracked by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub kind: AgentKind,
    #[serde(flatten)]
    pub position: GeoPosition,
    pub battery_level: f64,
    pub status: AgentStatus,
    pub sensors: SensorReadings,
    pub last_updated: DateTime<Utc>,
}

impl Agent {
    pub fn drone(id: impl Into<AgentId>, name: impl Into<String>) -> Self {
        Self::with_kind(id, name, AgentKind::Drone)
    }

    pub fn ground_bot(
        id: impl Into<AgentId>,
        name: impl Into<String>,
        assigned_task: Option<String>,
    ) -> Self {
        Self::with_kind(id, name, AgentKind::GroundBot { assigned_task })
    }

    fn with_kind(id: impl Into<AgentId>, name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position: GeoPosition::default(),
            battery_level: 100.0,
            status: AgentStatus::default(),
            sensors: SensorReadings::default(),
            last_updated: Utc::now(),
        }
    }

    pub fn at(mut self, position: GeoPosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_battery(mut self, level: f64) -> Self {
        self.set_battery(level);
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_sensors(mut self, sensors: SensorReadings) -> Self {
        self.sensors = sensors;
        self
    }

    /// Set battery level, clamped to [0, 100]
    pub fn set_battery(&mut self, level: f64) {
        self.battery_level = level.clamp(0.0, 100.0);
    }

    pub fn agent_type(&self) -> AgentType {
        self.kind.agent_type()
    }

    pub fn is_drone(&self) -> bool {
        matches!(self.kind, AgentKind::Drone)
    }

    pub fn assigned_task(&self) -> Option<&str> {
        match &self.kind {
            AgentKind::GroundBot { assigned_task } => assigned_task.as_deref(),
            AgentKind::Drone => None,
        }
    }
}

// ============================================================================
// COMMAND MODELS
// ============================================================================

/// Operator command understood by every agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FleetCommand {
    #[serde(rename = "Return to Base")]
    ReturnToBase,
    #[serde(rename = "Move to Location")]
    MoveToLocation,
    #[serde(rename = "Start Mission")]
    StartMission,
    #[serde(rename = "Stop Mission")]
    StopMission,
    #[serde(rename = "Scan Area")]
    ScanArea,
}

impl FleetCommand {
    pub const ALL: [FleetCommand; 5] = [
        FleetCommand::ReturnToBase,
        FleetCommand::MoveToLocation,
        FleetCommand::StartMission,
        FleetCommand::StopMission,
        FleetCommand::ScanArea,
    ];

    /// Coordinates or an area label must accompany these commands
    pub fn requires_parameters(&self) -> bool {
        matches!(self, FleetCommand::MoveToLocation | FleetCommand::ScanArea)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FleetCommand::ReturnToBase => "Return to Base",
            FleetCommand::MoveToLocation => "Move to Location",
            FleetCommand::StartMission => "Start Mission",
            FleetCommand::StopMission => "Stop Mission",
            FleetCommand::ScanArea => "Scan Area",
        }
    }
}

impl fmt::Display for FleetCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FleetCommand {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::unknown_variant("command", s))
    }
}

/// Delivery lifecycle of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandStatus {
    Pending,
    Sent,
    Acknowledged,
    Completed,
    Failed,
}

impl CommandStatus {
    /// Whether `next` is the single permitted step from this status.
    /// `Failed` is reachable from any non-terminal state.
    pub fn can_advance_to(&self, next: CommandStatus) -> bool {
        matches!(
            (self, next),
            (CommandStatus::Pending, CommandStatus::Sent)
                | (CommandStatus::Sent, CommandStatus::Acknowledged)
                | (CommandStatus::Acknowledged, CommandStatus::Completed)
                | (
                    CommandStatus::Pending | CommandStatus::Sent | CommandStatus::Acknowledged,
                    CommandStatus::Failed
                )
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Completed | CommandStatus::Failed)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Record of an operator-issued command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLog {
    pub id: CommandLogId,
    pub agent_id: AgentId,
    pub command: FleetCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: CommandStatus,
}

impl CommandLog {
    /// New command in the `Sent` state
    pub fn sent(agent_id: AgentId, command: FleetCommand, parameters: Option<String>) -> Self {
        Self {
            id: CommandLogId::generate(),
            agent_id,
            command,
            parameters,
            timestamp: Utc::now(),
            status: CommandStatus::Sent,
        }
    }

    /// Move to `next`, rejecting skips and reversals
    pub fn advance(&mut self, next: CommandStatus) -> CoreResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(CoreError::invalid_transition(self.status, next));
        }
        self.status = next;
        Ok(())
    }
}

// ============================================================================
// ALERT MODELS
// ============================================================================

/// Condition an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "Low Battery")]
    LowBattery,
    #[serde(rename = "High Temperature")]
    HighTemperature,
    #[serde(rename = "Gas Leak")]
    GasLeak,
    #[serde(rename = "Connection Lost")]
    ConnectionLost,
    #[serde(rename = "System Error")]
    SystemError,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::LowBattery => write!(f, "Low Battery"),
            AlertType::HighTemperature => write!(f, "High Temperature"),
            AlertType::GasLeak => write!(f, "Gas Leak"),
            AlertType::ConnectionLost => write!(f, "Connection Lost"),
            AlertType::SystemError => write!(f, "System Error"),
        }
    }
}

/// Severity level of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Derived notification keyed by (agent, condition)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub agent_id: AgentId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub severity: AlertSeverity,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

impl Alert {
    pub fn new(
        agent_id: AgentId,
        alert_type: AlertType,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: AlertId::generate(),
            agent_id,
            alert_type,
            message: message.into(),
            severity,
            timestamp: Utc::now(),
            acknowledged: false,
        }
    }

    /// Whether this alert blocks a new one for the same (agent, type)
    pub fn is_live_for(&self, agent_id: &AgentId, alert_type: AlertType) -> bool {
        !self.acknowledged && self.alert_type == alert_type && &self.agent_id == agent_id
    }
}

// ============================================================================
// STATUS LOG MODELS
// ============================================================================

/// Severity of a narrative status log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warning,
    Critical,
}

/// Entry in the narrative feed of agent and system events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusLog {
    pub id: StatusLogId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    pub agent_type: AgentType,
    pub message: String,
    pub severity: LogSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<serde_json::Value>,
}

impl StatusLog {
    pub fn new(
        agent_id: Option<AgentId>,
        agent_type: AgentType,
        severity: LogSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: StatusLogId::generate(),
            timestamp: Utc::now(),
            agent_id,
            agent_type,
            message: message.into(),
            severity,
            raw_data: None,
        }
    }

    /// Informational entry about an agent
    pub fn info(agent_id: AgentId, agent_type: AgentType, message: impl Into<String>) -> Self {
        Self::new(Some(agent_id), agent_type, LogSeverity::Info, message)
    }

    /// System-wide entry with no agent attached
    pub fn system(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self::new(None, AgentType::System, severity, message)
    }

    pub fn with_raw_data(mut self, raw: serde_json::Value) -> Self {
        self.raw_data = Some(raw);
        self
    }
}

// ============================================================================
// HUMAN REPORT MODELS
// ============================================================================

/// Category of a field report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    Sighting,
    Casualty,
    Hazard,
    Request,
}

/// Handling state of a field report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    New,
    Acknowledged,
    InProgress,
    Resolved,
}

impl ReportStatus {
    /// One step along new → acknowledged → inProgress → resolved
    pub fn next(&self) -> ReportStatus {
        match self {
            ReportStatus::New => ReportStatus::Acknowledged,
            ReportStatus::Acknowledged => ReportStatus::InProgress,
            ReportStatus::InProgress | ReportStatus::Resolved => ReportStatus::Resolved,
        }
    }
}

/// Report submitted by a human team in the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanReport {
    pub id: ReportId,
    pub timestamp: DateTime<Utc>,
    pub location: GeoPosition,
    pub reporter: String,
    pub message: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub status: ReportStatus,
}

impl HumanReport {
    pub fn new(
        reporter: impl Into<String>,
        report_type: ReportType,
        location: GeoPosition,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: ReportId::generate(),
            timestamp: Utc::now(),
            location,
            reporter: reporter.into(),
            message: message.into(),
            report_type,
            status: ReportStatus::New,
        }
    }
}

// ============================================================================
// ENVIRONMENT MODELS
// ============================================================================

/// Operation-wide weather conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Celsius
    pub temperature: f64,
    /// Percent
    pub humidity: f64,
    /// km/h
    pub wind_speed: f64,
    pub wind_direction: String,
    /// mm
    pub precipitation: f64,
    pub forecast: String,
    pub last_updated: DateTime<Utc>,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self {
            temperature: 22.4,
            humidity: 65.0,
            wind_speed: 12.0,
            wind_direction: "NW".into(),
            precipitation: 0.2,
            forecast: "Partly Cloudy".into(),
            last_updated: Utc::now(),
        }
    }
}

/// Kind of static map overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GisFeatureType {
    Roadblock,
    Hazard,
    SafeZone,
}

/// Static map overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GisFeature {
    #[serde(rename = "type")]
    pub feature_type: GisFeatureType,
    pub coordinates: [f64; 2],
    /// Meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    pub description: String,
}

// ============================================================================
// HISTORY MODELS
// ============================================================================

/// One battery reading in an agent's history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One sensor reading in an agent's history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub gas_level: f64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_creation() {
        let drone = Agent::drone("drone-1", "Rescue Drone 1");
        assert_eq!(drone.id.as_str(), "drone-1");
        assert_eq!(drone.status, AgentStatus::Operational);
        assert_eq!(drone.agent_type(), AgentType::Drone);

        let bot = Agent::ground_bot("bot-1", "Ground Bot Alpha", Some("Search Grid A4".into()));
        assert_eq!(bot.agent_type(), AgentType::GroundBot);
        assert_eq!(bot.assigned_task(), Some("Search Grid A4"));
    }

    #[test]
    fn test_battery_is_clamped() {
        let drone = Agent::drone("drone-1", "Rescue Drone 1").with_battery(140.0);
        assert_eq!(drone.battery_level, 100.0);

        let drone = drone.with_battery(-3.0);
        assert_eq!(drone.battery_level, 0.0);
    }

    #[test]
    fn test_agent_kind_is_explicit_on_the_wire() {
        let bot = Agent::ground_bot("drone-lookalike", "Bot", None);
        let json = serde_json::to_value(&bot).unwrap();

        assert_eq!(json["kind"]["type"], "groundBot");
        assert_eq!(json["latitude"], 0.0);

        let back: Agent = serde_json::from_value(json).unwrap();
        assert!(!back.is_drone());
    }

    #[test]
    fn test_status_labels() {
        let json = serde_json::to_string(&AgentStatus::LowBattery).unwrap();
        assert_eq!(json, "\"Low Battery\"");
        assert_eq!(AgentStatus::LowBattery.to_string(), "Low Battery");
        assert!(AgentStatus::LowBattery.is_mobile());
        assert!(!AgentStatus::Maintenance.is_mobile());
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            "Return to Base".parse::<FleetCommand>().unwrap(),
            FleetCommand::ReturnToBase
        );
        assert_eq!(
            "scan area".parse::<FleetCommand>().unwrap(),
            FleetCommand::ScanArea
        );
        assert!("Self Destruct".parse::<FleetCommand>().is_err());
        assert!(FleetCommand::MoveToLocation.requires_parameters());
        assert!(!FleetCommand::StopMission.requires_parameters());
    }

    #[test]
    fn test_command_lifecycle_is_monotonic() {
        let mut log = CommandLog::sent(AgentId::new("drone-1"), FleetCommand::StartMission, None);
        assert_eq!(log.status, CommandStatus::Sent);

        assert!(log.advance(CommandStatus::Completed).is_err());
        log.advance(CommandStatus::Acknowledged).unwrap();
        assert!(log.advance(CommandStatus::Sent).is_err());
        log.advance(CommandStatus::Completed).unwrap();
        assert!(log.advance(CommandStatus::Failed).is_err());
        assert!(log.status.is_terminal());
    }

    #[test]
    fn test_report_status_steps() {
        assert_eq!(ReportStatus::New.next(), ReportStatus::Acknowledged);
        assert_eq!(ReportStatus::Acknowledged.next(), ReportStatus::InProgress);
        assert_eq!(ReportStatus::InProgress.next(), ReportStatus::Resolved);
        assert_eq!(ReportStatus::Resolved.next(), ReportStatus::Resolved);
    }

    #[test]
    fn test_alert_liveness() {
        let agent = AgentId::new("drone-1");
        let mut alert = Alert::new(
            agent.clone(),
            AlertType::GasLeak,
            AlertSeverity::Critical,
            "gas",
        );

        assert!(alert.is_live_for(&agent, AlertType::GasLeak));
        assert!(!alert.is_live_for(&agent, AlertType::LowBattery));

        alert.acknowledged = true;
        assert!(!alert.is_live_for(&agent, AlertType::GasLeak));
    }

    #[test]
    fn test_generated_ids_are_prefixed() {
        assert!(CommandLogId::generate().as_str().starts_with("cmd-"));
        assert!(AlertId::generate().as_str().starts_with("alert-"));
        assert_ne!(StatusLogId::generate(), StatusLogId::generate());
    }
}
