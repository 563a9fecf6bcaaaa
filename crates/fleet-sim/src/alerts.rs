//! Threshold alert evaluation
//!
//! Alerts are derived from the current telemetry of every agent. A rule only
//! fires when no unacknowledged alert of the same type already exists for the
//! agent, so a persistent condition produces one alert until an operator
//! acknowledges it.

use fleet_core::{Agent, Alert, AlertSeverity, AlertType};

/// Battery below this raises a Low Battery alert
pub const LOW_BATTERY_THRESHOLD: f64 = 10.0;
/// Battery below this makes the Low Battery alert critical
pub const LOW_BATTERY_CRITICAL: f64 = 5.0;
/// Temperature above this raises a High Temperature alert
pub const HIGH_TEMPERATURE_THRESHOLD: f64 = 35.0;
pub const HIGH_TEMPERATURE_CRITICAL: f64 = 40.0;
/// Gas above this raises a Gas Leak alert
pub const GAS_LEAK_THRESHOLD: f64 = 200.0;
pub const GAS_LEAK_CRITICAL: f64 = 250.0;

/// Alerts for conditions that are not already covered by a live alert
pub fn new_alerts(agents: &[Agent], existing: &[Alert]) -> Vec<Alert> {
    let mut raised: Vec<Alert> = Vec::new();

    for agent in agents {
        for (alert_type, severity, message) in triggered(agent) {
            let covered = existing
                .iter()
                .chain(raised.iter())
                .any(|a| a.is_live_for(&agent.id, alert_type));

            if !covered {
                raised.push(Alert::new(agent.id.clone(), alert_type, severity, message));
            }
        }
    }

    raised
}

/// Existing alerts followed by every newly raised one
pub fn evaluate(agents: &[Agent], existing: &[Alert]) -> Vec<Alert> {
    let mut merged = existing.to_vec();
    merged.extend(new_alerts(agents, existing));
    merged
}

fn triggered(agent: &Agent) -> Vec<(AlertType, AlertSeverity, String)> {
    let mut out = Vec::new();
    let battery = agent.battery_level;
    let temperature = agent.sensors.temperature;
    let gas = agent.sensors.gas_level;

    if battery < LOW_BATTERY_THRESHOLD {
        out.push((
            AlertType::LowBattery,
            severity(battery < LOW_BATTERY_CRITICAL),
            format!("{} battery critically low at {:.1}%", agent.name, battery),
        ));
    }

    if temperature > HIGH_TEMPERATURE_THRESHOLD {
        out.push((
            AlertType::HighTemperature,
            severity(temperature > HIGH_TEMPERATURE_CRITICAL),
            format!("{} temperature at {:.1}°C", agent.name, temperature),
        ));
    }

    if gas > GAS_LEAK_THRESHOLD {
        out.push((
            AlertType::GasLeak,
            severity(gas > GAS_LEAK_CRITICAL),
            format!("{} detected high gas concentration: {:.0} ppm", agent.name, gas),
        ));
    }

    out
}

fn severity(critical: bool) -> AlertSeverity {
    if critical {
        AlertSeverity::Critical
    } else {
        AlertSeverity::Warning
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::{AgentId, SensorReadings};

    fn calm(id: &str) -> Agent {
        Agent::drone(id, format!("Drone {}", id))
            .with_battery(80.0)
            .with_sensors(SensorReadings::new(22.0, 10.0, None))
    }

    #[test]
    fn test_single_low_battery_warning() {
        let mut agents: Vec<Agent> = (1..=5).map(|i| calm(&format!("drone-{}", i))).collect();
        agents[2] = agents[2]
            .clone()
            .with_battery(8.0)
            .with_sensors(SensorReadings::new(30.0, 0.0, None));

        let alerts = evaluate(&agents, &[]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].agent_id.as_str(), "drone-3");
        assert_eq!(alerts[0].alert_type, AlertType::LowBattery);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
        assert_eq!(alerts[0].message, "Drone drone-3 battery critically low at 8.0%");
    }

    #[test]
    fn test_critical_severities() {
        let agent = calm("drone-1")
            .with_battery(4.0)
            .with_sensors(SensorReadings::new(41.0, 260.0, None));

        let alerts = evaluate(std::slice::from_ref(&agent), &[]);

        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Critical));
        assert!(alerts
            .iter()
            .any(|a| a.message == "Drone drone-1 detected high gas concentration: 260 ppm"));
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let agent = calm("drone-1")
            .with_battery(10.0)
            .with_sensors(SensorReadings::new(35.0, 200.0, None));

        assert!(evaluate(&[agent], &[]).is_empty());
    }

    #[test]
    fn test_no_duplicate_live_alerts() {
        let agent = calm("drone-1").with_battery(7.0);
        let agents = vec![agent];

        let first = evaluate(&agents, &[]);
        let second = evaluate(&agents, &first);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn test_acknowledgement_restores_eligibility() {
        let agents = vec![calm("drone-1").with_battery(7.0)];

        let mut alerts = evaluate(&agents, &[]);
        alerts[0].acknowledged = true;

        let after = evaluate(&agents, &alerts);
        assert_eq!(after.len(), 2);
        assert!(!after[1].acknowledged);
    }

    #[test]
    fn test_live_alert_for_other_agent_does_not_block() {
        let existing = vec![Alert::new(
            AgentId::new("drone-9"),
            AlertType::LowBattery,
            AlertSeverity::Warning,
            "other",
        )];
        let agents = vec![calm("drone-1").with_battery(7.0)];

        assert_eq!(new_alerts(&agents, &existing).len(), 1);
    }

    #[test]
    fn test_order_independent() {
        let a = calm("drone-1").with_battery(7.0);
        let b = calm("drone-2").with_sensors(SensorReadings::new(38.0, 0.0, None));

        let forward = new_alerts(&[a.clone(), b.clone()], &[]);
        let backward = new_alerts(&[b, a], &[]);

        let key = |alerts: &[Alert]| {
            let mut k: Vec<_> = alerts
                .iter()
                .map(|x| (x.agent_id.clone(), x.alert_type.to_string()))
                .collect();
            k.sort();
            k
        };
        assert_eq!(key(&forward), key(&backward));
    }
}
