//! API server configuration

use config::{Config, ConfigError, Environment, File};
use fleet_db::DbConfig;
use fleet_sim::StoreConfig;
use serde::Deserialize;
use std::time::Duration;

/// Which document store backs the `/documents` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocstoreBackend {
    Memory,
    Scylla,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST API port
    pub api_port: u16,
    /// WebSocket port
    pub ws_port: u16,
    /// Enable CORS for all origins (development)
    pub cors_permissive: bool,
    pub docstore_backend: DocstoreBackend,
    /// Comma separated contact points
    pub scylla_hosts: String,
    pub scylla_keyspace: String,
    /// Drones generated at start-up and on reset
    pub fleet_size: usize,
    pub tick_interval_ms: u64,
    pub history_capacity: usize,
    /// Fixed simulation seed for reproducible runs
    #[serde(default)]
    pub sim_seed: Option<u64>,
    pub seed_demo_data: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: 3000,
            ws_port: 9090,
            cors_permissive: true,
            docstore_backend: DocstoreBackend::Memory,
            scylla_hosts: "127.0.0.1:9042".into(),
            scylla_keyspace: "rescue_fleet".into(),
            fleet_size: 5,
            tick_interval_ms: 3000,
            history_capacity: 100,
            sim_seed: None,
            seed_demo_data: true,
        }
    }
}

impl ApiConfig {
    /// Load defaults, then `fleet.toml` if present, then the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_environment(Environment::default())
    }

    fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("api_port", i64::from(defaults.api_port))?
            .set_default("ws_port", i64::from(defaults.ws_port))?
            .set_default("cors_permissive", defaults.cors_permissive)?
            .set_default("docstore_backend", "memory")?
            .set_default("scylla_hosts", defaults.scylla_hosts)?
            .set_default("scylla_keyspace", defaults.scylla_keyspace)?
            .set_default("fleet_size", defaults.fleet_size as i64)?
            .set_default("tick_interval_ms", defaults.tick_interval_ms as i64)?
            .set_default("history_capacity", defaults.history_capacity as i64)?
            .set_default("seed_demo_data", defaults.seed_demo_data)?
            .add_source(File::with_name("fleet").required(false))
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Simulation settings for the fleet store
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            fleet_size: self.fleet_size,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            history_capacity: self.history_capacity,
            seed: self.sim_seed,
            seed_demo_data: self.seed_demo_data,
            ..StoreConfig::default()
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.scylla_hosts, self.scylla_keyspace.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
