//! # Fleet Sim - Simulation & Orchestration
//!
//! Central coordination for the rescue fleet dashboard. Owns the canonical
//! fleet state and drives it forward on a fixed tick.
//!
//! ## Features
//! - Mock telemetry generation (random-walk positions, battery, sensors)
//! - Threshold alert evaluation with per-(agent, type) de-duplication
//! - Timed command lifecycle with cancellation
//! - Bounded per-agent battery and sensor history
//! - Event bus feeding dashboards and metrics

pub mod alerts;
pub mod commands;
pub mod demo;
pub mod events;
pub mod generator;
pub mod history;
pub mod sound;
pub mod store;

pub use events::EventBus;
pub use sound::{AlertSound, Silent, SoundError, TerminalBell};
pub use store::FleetStore;

use std::time::Duration;

/// Fleet store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of drones generated at start-up and on reset
    pub fleet_size: usize,
    /// Period of the simulation tick
    pub tick_interval: Duration,
    /// Delay from Sent to Acknowledged
    pub ack_delay: Duration,
    /// Delay from Acknowledged to Completed
    pub completion_delay: Duration,
    /// Most recent status logs kept
    pub status_log_capacity: usize,
    /// Samples kept per agent per history series
    pub history_capacity: usize,
    /// Chance per tick that the weather drifts
    pub weather_update_probability: f64,
    /// Chance per tick that an agent emits a narrative status log
    pub status_log_probability: f64,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Start with the demo ground bots, reports and history
    pub seed_demo_data: bool,
    /// Broadcast channel capacity of the event bus
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fleet_size: 5,
            tick_interval: Duration::from_millis(3000),
            ack_delay: Duration::from_millis(2000),
            completion_delay: Duration::from_millis(5000),
            status_log_capacity: 50,
            history_capacity: 100,
            weather_update_probability: 0.2,
            status_log_probability: 0.3,
            seed: None,
            seed_demo_data: true,
            event_capacity: 1024,
        }
    }
}
