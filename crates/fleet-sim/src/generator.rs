//! Mock telemetry generation
//!
//! Produces the initial drone fleet and advances every agent by one
//! random-walk step per tick. All functions are pure apart from the RNG they
//! are handed, so callers can seed them for reproducible runs.

use chrono::Utc;
use fleet_core::{
    Agent, AgentKind, AgentStatus, GeoPosition, LogSeverity, SensorReadings, StatusLog,
    WeatherSnapshot, EARTH_RADIUS_KM,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::f64::consts::PI;

/// Operation center the fleet is scattered around
pub const FLEET_CENTER: GeoPosition = GeoPosition {
    latitude: 51.505,
    longitude: -0.09,
};

/// Radius of the initial scatter
pub const FLEET_RADIUS_KM: f64 = 2.0;

/// Per-tick drift behaviour for one kind of agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftRules {
    /// Max positional jitter per axis, degrees
    pub jitter_degrees: f64,
    /// Battery drain per tick is uniform in [0, max_drain)
    pub max_drain: f64,
    /// Battery at or below (or strictly below) this becomes Critical
    pub critical_below: f64,
    /// Battery at or below (or strictly below) this becomes Low Battery
    pub low_below: f64,
    /// Whether the two thresholds include their boundary value
    pub inclusive_thresholds: bool,
    /// Half-width of the temperature random walk, °C
    pub temperature_step: f64,
    /// Temperature never drops below this, when set
    pub temperature_floor: Option<f64>,
    /// Half-width of the gas random walk, ppm
    pub gas_step: f64,
}

impl DriftRules {
    pub const DRONE: DriftRules = DriftRules {
        jitter_degrees: 0.0005,
        max_drain: 1.0,
        critical_below: 5.0,
        low_below: 15.0,
        inclusive_thresholds: true,
        temperature_step: 1.0,
        temperature_floor: Some(0.0),
        gas_step: 7.5,
    };

    pub const GROUND_BOT: DriftRules = DriftRules {
        jitter_degrees: 0.0005,
        max_drain: 0.3,
        critical_below: 10.0,
        low_below: 30.0,
        inclusive_thresholds: false,
        temperature_step: 0.5,
        temperature_floor: None,
        gas_step: 2.5,
    };

    pub fn for_kind(kind: &AgentKind) -> DriftRules {
        match kind {
            AgentKind::Drone => Self::DRONE,
            AgentKind::GroundBot { .. } => Self::GROUND_BOT,
        }
    }

    /// Status after a drain. Never promotes back to Operational.
    pub fn degrade(&self, battery: f64, current: AgentStatus) -> AgentStatus {
        let below = |threshold: f64| {
            if self.inclusive_thresholds {
                battery <= threshold
            } else {
                battery < threshold
            }
        };

        if below(self.critical_below) {
            AgentStatus::Critical
        } else if below(self.low_below) {
            AgentStatus::LowBattery
        } else {
            current
        }
    }
}

/// Uniformly random point within `radius_km` of `center`
pub fn random_position<R: Rng>(center: &GeoPosition, radius_km: f64, rng: &mut R) -> GeoPosition {
    let angle = rng.gen_range(0.0..2.0 * PI);
    let arc = rng.gen_range(0.0..1.0) * (radius_km / EARTH_RADIUS_KM);
    center.offset_equirectangular(arc, angle)
}

/// Status assigned to a freshly generated agent
pub fn initial_status<R: Rng>(battery: f64, rng: &mut R) -> AgentStatus {
    if battery < 10.0 {
        AgentStatus::Critical
    } else if battery < 20.0 {
        AgentStatus::LowBattery
    } else if rng.gen_bool(0.1) {
        AgentStatus::Maintenance
    } else {
        AgentStatus::Operational
    }
}

/// Generate `count` drones scattered around the operation center
pub fn create_fleet<R: Rng>(count: usize, rng: &mut R) -> Vec<Agent> {
    (1..=count)
        .map(|i| {
            let battery = f64::from(rng.gen_range(40..=100u32));
            let sensors = SensorReadings::new(
                f64::from(rng.gen_range(15..40u32)),
                f64::from(rng.gen_range(0..300u32)),
                Some(f64::from(rng.gen_range(30..90u32))),
            );
            let status = initial_status(battery, rng);

            Agent::drone(format!("drone-{}", i), format!("Rescue Drone {}", i))
                .at(random_position(&FLEET_CENTER, FLEET_RADIUS_KM, rng))
                .with_battery(battery)
                .with_status(status)
                .with_sensors(sensors)
        })
        .collect()
}

/// Advance every agent by one tick and return the new collection.
///
/// Agents that are not Operational or Low Battery are returned unchanged.
pub fn advance_tick<R: Rng>(agents: &[Agent], rng: &mut R) -> Vec<Agent> {
    agents.iter().map(|agent| advance_agent(agent, rng)).collect()
}

fn advance_agent<R: Rng>(agent: &Agent, rng: &mut R) -> Agent {
    if !agent.status.is_mobile() {
        return agent.clone();
    }

    let rules = DriftRules::for_kind(&agent.kind);
    let mut next = agent.clone();

    next.position = agent.position.shifted(
        rng.gen_range(-rules.jitter_degrees..rules.jitter_degrees),
        rng.gen_range(-rules.jitter_degrees..rules.jitter_degrees),
    );

    next.set_battery((agent.battery_level - rng.gen_range(0.0..rules.max_drain)).max(0.0));
    next.status = rules.degrade(next.battery_level, agent.status);

    let temperature = agent.sensors.temperature
        + rng.gen_range(-rules.temperature_step..rules.temperature_step);
    next.sensors.temperature = match rules.temperature_floor {
        Some(floor) => temperature.max(floor),
        None => temperature,
    };
    next.sensors.gas_level =
        (agent.sensors.gas_level + rng.gen_range(-rules.gas_step..rules.gas_step)).max(0.0);

    next.last_updated = Utc::now();
    next
}

/// Drift the weather by one step
pub fn drift_weather<R: Rng>(weather: &WeatherSnapshot, rng: &mut R) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: weather.temperature + rng.gen_range(-0.5..0.5),
        humidity: (weather.humidity + rng.gen_range(-1.5..1.5)).clamp(0.0, 100.0),
        wind_speed: (weather.wind_speed + rng.gen_range(-1.0..1.0)).max(0.0),
        last_updated: Utc::now(),
        ..weather.clone()
    }
}

/// Narrative message an agent might report.
///
/// A nearly empty battery or elevated gas overrides the random pick.
pub fn status_message<R: Rng>(agent: &Agent, rng: &mut R) -> String {
    if agent.battery_level < 15.0 {
        return format!(
            "CRITICAL: Battery level critical at {:.0}%, initiating emergency protocols",
            agent.battery_level
        );
    }

    if agent.sensors.gas_level > 50.0 {
        return format!(
            "WARNING: Elevated gas levels detected ({:.0} ppm), potentially hazardous environment",
            agent.sensors.gas_level
        );
    }

    let messages = [
        format!(
            "Completed scan of sector at {:.4}, {:.4}",
            agent.position.latitude, agent.position.longitude
        ),
        format!(
            "Detected unusual heat signature of {:.1}°C",
            agent.sensors.temperature
        ),
        format!("Gas level reading: {:.0} ppm", agent.sensors.gas_level),
        "Moving to new search area".to_string(),
        format!("Battery level at {:.0}%", agent.battery_level),
        "Successfully identified objects in current location".to_string(),
        "Communication signal strength fluctuating".to_string(),
        "Environmental conditions stable".to_string(),
    ];

    let index = rng.gen_range(0..messages.len());
    messages[index].clone()
}

/// Random narrative status log for one uniformly chosen agent
pub fn random_status_log<R: Rng>(agents: &[Agent], rng: &mut R) -> Option<StatusLog> {
    let agent = agents.choose(rng)?;

    let severity = if rng.gen_bool(0.2) {
        LogSeverity::Critical
    } else if rng.gen_bool(0.5) {
        LogSeverity::Warning
    } else {
        LogSeverity::Info
    };

    let message = status_message(agent, rng);
    let log = StatusLog::new(Some(agent.id.clone()), agent.agent_type(), severity, message)
        .with_raw_data(json!({
            "temperature": agent.sensors.temperature,
            "gasLevel": agent.sensors.gas_level,
            "location": agent.position.to_array(),
        }));

    Some(log)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::AgentType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_create_fleet_shape() {
        let mut rng = rng();
        let fleet = create_fleet(5, &mut rng);

        assert_eq!(fleet.len(), 5);
        assert_eq!(fleet[0].id.as_str(), "drone-1");
        assert_eq!(fleet[4].name, "Rescue Drone 5");

        for drone in &fleet {
            assert!(drone.is_drone());
            assert!((40.0..=100.0).contains(&drone.battery_level));
            assert!((15.0..40.0).contains(&drone.sensors.temperature));
            assert!((0.0..300.0).contains(&drone.sensors.gas_level));
            let humidity = drone.sensors.humidity.unwrap();
            assert!((30.0..90.0).contains(&humidity));
            assert!(matches!(
                drone.status,
                AgentStatus::Operational | AgentStatus::Maintenance
            ));
            // A little slack for the equirectangular approximation
            assert!(FLEET_CENTER.distance_to(&drone.position) <= FLEET_RADIUS_KM * 1.01);
        }
    }

    #[test]
    fn test_initial_status_thresholds() {
        let mut rng = rng();
        assert_eq!(initial_status(5.0, &mut rng), AgentStatus::Critical);
        assert_eq!(initial_status(15.0, &mut rng), AgentStatus::LowBattery);
        assert!(matches!(
            initial_status(80.0, &mut rng),
            AgentStatus::Operational | AgentStatus::Maintenance
        ));
    }

    #[test]
    fn test_battery_stays_in_range() {
        let mut rng = rng();
        let mut agents = create_fleet(8, &mut rng);
        agents.push(Agent::ground_bot("bot-1", "Bot", None).with_battery(3.0));

        for _ in 0..500 {
            agents = advance_tick(&agents, &mut rng);
            for agent in &agents {
                assert!((0.0..=100.0).contains(&agent.battery_level));
            }
        }
    }

    #[test]
    fn test_frozen_agents_do_not_move() {
        let mut rng = rng();
        let frozen = vec![
            Agent::drone("drone-1", "A").with_status(AgentStatus::Maintenance),
            Agent::drone("drone-2", "B").with_status(AgentStatus::Critical),
            Agent::ground_bot("bot-1", "C", None).with_status(AgentStatus::Offline),
        ];

        let next = advance_tick(&frozen, &mut rng);
        assert_eq!(next, frozen);
    }

    #[test]
    fn test_mobile_agents_move_within_jitter() {
        let mut rng = rng();
        let agent = Agent::drone("drone-1", "A").at(FLEET_CENTER).with_battery(90.0);

        let next = advance_tick(std::slice::from_ref(&agent), &mut rng).remove(0);
        assert!((next.position.latitude - agent.position.latitude).abs() <= 0.0005);
        assert!((next.position.longitude - agent.position.longitude).abs() <= 0.0005);
        assert!(next.battery_level <= agent.battery_level);
        assert!(agent.battery_level - next.battery_level < 1.0);
    }

    #[test]
    fn test_no_promotion_to_operational() {
        let mut rng = rng();
        let mut agents = vec![
            Agent::drone("drone-1", "A")
                .with_battery(60.0)
                .with_status(AgentStatus::LowBattery),
            Agent::ground_bot("bot-1", "B", None)
                .with_battery(60.0)
                .with_status(AgentStatus::LowBattery),
        ];

        for _ in 0..100 {
            let next = advance_tick(&agents, &mut rng);
            for (before, after) in agents.iter().zip(&next) {
                if before.status != AgentStatus::Operational {
                    assert_ne!(after.status, AgentStatus::Operational);
                }
            }
            agents = next;
        }
    }

    #[test]
    fn test_drone_and_bot_thresholds_differ() {
        let drone = DriftRules::DRONE;
        assert_eq!(drone.degrade(5.0, AgentStatus::Operational), AgentStatus::Critical);
        assert_eq!(drone.degrade(15.0, AgentStatus::Operational), AgentStatus::LowBattery);
        assert_eq!(drone.degrade(15.1, AgentStatus::Operational), AgentStatus::Operational);

        let bot = DriftRules::GROUND_BOT;
        assert_eq!(bot.degrade(10.0, AgentStatus::Operational), AgentStatus::LowBattery);
        assert_eq!(bot.degrade(9.9, AgentStatus::Operational), AgentStatus::Critical);
        assert_eq!(bot.degrade(29.0, AgentStatus::Operational), AgentStatus::LowBattery);
        assert_eq!(bot.degrade(30.0, AgentStatus::LowBattery), AgentStatus::LowBattery);
    }

    #[test]
    fn test_gas_never_negative() {
        let mut rng = rng();
        let mut agents = vec![Agent::drone("drone-1", "A")
            .with_battery(100.0)
            .with_sensors(SensorReadings::new(20.0, 0.0, None))];

        for _ in 0..50 {
            agents = advance_tick(&agents, &mut rng);
            assert!(agents[0].sensors.gas_level >= 0.0);
        }
    }

    #[test]
    fn test_weather_drift_bounds() {
        let mut rng = rng();
        let mut weather = WeatherSnapshot {
            humidity: 99.5,
            wind_speed: 0.2,
            ..WeatherSnapshot::default()
        };

        for _ in 0..200 {
            weather = drift_weather(&weather, &mut rng);
            assert!((0.0..=100.0).contains(&weather.humidity));
            assert!(weather.wind_speed >= 0.0);
            assert_eq!(weather.forecast, "Partly Cloudy");
        }
    }

    #[test]
    fn test_status_message_overrides() {
        let mut rng = rng();
        let low = Agent::drone("drone-1", "A").with_battery(12.0);
        assert!(status_message(&low, &mut rng).starts_with("CRITICAL:"));

        let gassy = Agent::drone("drone-2", "B")
            .with_battery(80.0)
            .with_sensors(SensorReadings::new(20.0, 75.0, None));
        assert!(status_message(&gassy, &mut rng).starts_with("WARNING:"));
    }

    #[test]
    fn test_random_status_log() {
        let mut rng = rng();
        assert!(random_status_log(&[], &mut rng).is_none());

        let agents = vec![Agent::ground_bot("bot-1", "Bot", None)];
        let log = random_status_log(&agents, &mut rng).unwrap();

        assert_eq!(log.agent_id.as_ref().map(|id| id.as_str()), Some("bot-1"));
        assert_eq!(log.agent_type, AgentType::GroundBot);
        assert!(log.raw_data.unwrap().get("gasLevel").is_some());
    }
}
