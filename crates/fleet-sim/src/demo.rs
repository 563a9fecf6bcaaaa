//! Demo data the dashboard starts with

use chrono::{Duration, Utc};
use fleet_core::{
    Agent, AgentId, AgentStatus, AgentType, Alert, AlertId, AlertSeverity, AlertType, CommandLog,
    CommandLogId, CommandStatus, FleetCommand, GeoPosition, GisFeature, GisFeatureType,
    HumanReport, LogSeverity, ReportId, ReportStatus, ReportType, SensorReadings, StatusLog,
    StatusLogId,
};
use serde_json::json;

pub fn ground_bots() -> Vec<Agent> {
    vec![
        Agent::ground_bot("bot-1", "Ground Bot Alpha", Some("Search Grid A4".into()))
            .at(GeoPosition::new(51.505, -0.09))
            .with_battery(78.0)
            .with_sensors(SensorReadings::new(24.5, 15.0, Some(65.0))),
        Agent::ground_bot("bot-2", "Ground Bot Beta", Some("Assist Medical Team".into()))
            .at(GeoPosition::new(51.503, -0.087))
            .with_battery(42.0)
            .with_status(AgentStatus::LowBattery)
            .with_sensors(SensorReadings::new(26.8, 35.0, Some(68.0))),
    ]
}

pub fn command_logs() -> Vec<CommandLog> {
    let now = Utc::now();
    let log = |id: &str, agent: &str, command, parameters: Option<&str>, minutes, status| {
        CommandLog {
            id: CommandLogId::new(id),
            agent_id: AgentId::new(agent),
            command,
            parameters: parameters.map(str::to_string),
            timestamp: now - Duration::minutes(minutes),
            status,
        }
    };

    vec![
        log("cmd-1", "drone-1", FleetCommand::StartMission, None, 60, CommandStatus::Completed),
        log(
            "cmd-2",
            "drone-2",
            FleetCommand::ScanArea,
            Some("Quadrant B3"),
            30,
            CommandStatus::Completed,
        ),
        log(
            "cmd-3",
            "drone-3",
            FleetCommand::MoveToLocation,
            Some("51.507, -0.115"),
            15,
            CommandStatus::Acknowledged,
        ),
    ]
}

pub fn alerts() -> Vec<Alert> {
    let now = Utc::now();
    let alert = |id: &str, agent: &str, alert_type, message: &str, severity, minutes, acked| Alert {
        id: AlertId::new(id),
        agent_id: AgentId::new(agent),
        alert_type,
        message: message.to_string(),
        severity,
        timestamp: now - Duration::minutes(minutes),
        acknowledged: acked,
    };

    vec![
        alert(
            "alert-1",
            "drone-2",
            AlertType::LowBattery,
            "Battery level below 15%",
            AlertSeverity::Warning,
            5,
            true,
        ),
        alert(
            "alert-2",
            "drone-4",
            AlertType::HighTemperature,
            "Temperature exceeds normal operating range",
            AlertSeverity::Warning,
            2,
            false,
        ),
        alert(
            "alert-3",
            "drone-3",
            AlertType::GasLeak,
            "Dangerous gas levels detected in sector C2",
            AlertSeverity::Critical,
            1,
            false,
        ),
    ]
}

/// Newest first
pub fn status_logs() -> Vec<StatusLog> {
    let now = Utc::now();

    let mut heat = StatusLog::new(
        Some(AgentId::new("drone-1")),
        AgentType::Drone,
        LogSeverity::Warning,
        "Detected unusual heat signature at building C, sending alert to command",
    )
    .with_raw_data(json!({ "temperature": 85.2, "location": [51.505, -0.09] }));
    heat.id = StatusLogId::new("log-1");
    heat.timestamp = now - Duration::minutes(2);

    let mut casualty = StatusLog::new(
        Some(AgentId::new("bot-1")),
        AgentType::GroundBot,
        LogSeverity::Critical,
        "Identified potential casualty in sector A4, requesting medical team",
    )
    .with_raw_data(json!({ "location": [51.504, -0.091], "confidence": 0.89 }));
    casualty.id = StatusLogId::new("log-2");
    casualty.timestamp = now - Duration::minutes(5);

    let mut weather = StatusLog::system(
        LogSeverity::Info,
        "Weather alert: Wind speed increasing, potential impact on aerial operations",
    )
    .with_raw_data(json!({ "windSpeed": 25, "direction": "NW" }));
    weather.id = StatusLogId::new("log-3");
    weather.timestamp = now - Duration::minutes(10);

    vec![heat, casualty, weather]
}

pub fn human_reports() -> Vec<HumanReport> {
    let now = Utc::now();

    let mut sighting = HumanReport::new(
        "Field Team Alpha",
        ReportType::Sighting,
        GeoPosition::new(51.504, -0.091),
        "Group of civilians spotted at apartment building requiring evacuation",
    );
    sighting.id = ReportId::new("report-1");
    sighting.timestamp = now - Duration::minutes(15);
    sighting.status = ReportStatus::Acknowledged;

    let mut supplies = HumanReport::new(
        "Medical Team",
        ReportType::Request,
        GeoPosition::new(51.509, -0.093),
        "Medical supplies needed at evacuation center",
    );
    supplies.id = ReportId::new("report-2");
    supplies.timestamp = now - Duration::minutes(25);
    supplies.status = ReportStatus::InProgress;

    vec![sighting, supplies]
}

pub fn gis_features() -> Vec<GisFeature> {
    vec![
        GisFeature {
            feature_type: GisFeatureType::Roadblock,
            coordinates: [51.505, -0.09],
            radius: None,
            description: "Collapsed building blocking main road".into(),
        },
        GisFeature {
            feature_type: GisFeatureType::Hazard,
            coordinates: [51.503, -0.092],
            radius: Some(200.0),
            description: "Gas leak detected".into(),
        },
        GisFeature {
            feature_type: GisFeatureType::SafeZone,
            coordinates: [51.507, -0.088],
            radius: Some(500.0),
            description: "Emergency evacuation center".into(),
        },
    ]
}
