//! Fleet store: the single owner of fleet state
//!
//! Every mutation goes through a short critical section on one `RwLock`;
//! events are collected while the lock is held and published after it is
//! released.

use chrono::Utc;
use fleet_core::{
    Agent, AgentId, AgentType, Alert, AlertId, AlertSeverity, BatterySample, CommandLog, Event,
    FleetSnapshot, FleetStats, GisFeature, HumanReport, LogSeverity, Notification, ReportId,
    ReportStatus, SensorSample, StatusLog, WeatherSnapshot,
};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::CommandRegistry;
use crate::history::FleetHistory;
use crate::sound::AlertSound;
use crate::{alerts, demo, generator, EventBus, StoreConfig};

/// Mutable fleet state guarded by the store lock
pub(crate) struct FleetState {
    pub(crate) drones: Vec<Agent>,
    pub(crate) ground_bots: Vec<Agent>,
    pub(crate) alerts: Vec<Alert>,
    pub(crate) command_logs: Vec<CommandLog>,
    /// Newest first
    pub(crate) status_logs: VecDeque<StatusLog>,
    pub(crate) human_reports: Vec<HumanReport>,
    pub(crate) weather: WeatherSnapshot,
    pub(crate) gis_features: Vec<GisFeature>,
    pub(crate) selected: Option<AgentId>,
    pub(crate) history: FleetHistory,
    pub(crate) ticks: u64,
    pub(crate) rng: StdRng,
}

impl FleetState {
    fn initial(config: &StoreConfig, mut rng: StdRng) -> Self {
        let drones = generator::create_fleet(config.fleet_size, &mut rng);
        let mut state = Self {
            drones,
            ground_bots: Vec::new(),
            alerts: Vec::new(),
            command_logs: Vec::new(),
            status_logs: VecDeque::with_capacity(config.status_log_capacity),
            human_reports: Vec::new(),
            weather: WeatherSnapshot::default(),
            gis_features: Vec::new(),
            selected: None,
            history: FleetHistory::new(config.history_capacity),
            ticks: 0,
            rng,
        };

        if config.seed_demo_data {
            state.ground_bots = demo::ground_bots();
            state.alerts = demo::alerts();
            state.command_logs = demo::command_logs();
            state.human_reports = demo::human_reports();
            state.gis_features = demo::gis_features();
            state.status_logs = demo::status_logs().into_iter().collect();
            state.status_logs.truncate(config.status_log_capacity);
        }

        let now = Utc::now();
        state
            .history
            .record_all(state.drones.iter().chain(state.ground_bots.iter()), now);
        state
    }

    pub(crate) fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.drones
            .iter()
            .chain(self.ground_bots.iter())
            .find(|a| &a.id == id)
    }

    fn agents(&self) -> Vec<Agent> {
        self.drones
            .iter()
            .chain(self.ground_bots.iter())
            .cloned()
            .collect()
    }

    /// Newest first, trimmed to `capacity`
    pub(crate) fn push_status_log(&mut self, log: StatusLog, capacity: usize) {
        self.status_logs.push_front(log);
        self.status_logs.truncate(capacity);
    }

    fn snapshot(&self, active_commands: usize) -> FleetSnapshot {
        FleetSnapshot {
            drones: self.drones.clone(),
            ground_bots: self.ground_bots.clone(),
            alerts: self.alerts.clone(),
            command_logs: self.command_logs.clone(),
            status_logs: self.status_logs.iter().cloned().collect(),
            human_reports: self.human_reports.clone(),
            weather: self.weather.clone(),
            gis_features: self.gis_features.clone(),
            selected_agent_id: self.selected.clone(),
            battery_history: self.history.battery_snapshot(),
            sensor_history: self.history.sensor_snapshot(),
            stats: FleetStats::compute(
                self.drones.iter().chain(self.ground_bots.iter()),
                &self.alerts,
                active_commands,
                self.ticks,
            ),
            timestamp: Utc::now(),
        }
    }
}

struct Lifecycle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub(crate) struct StoreInner {
    pub(crate) config: StoreConfig,
    pub(crate) state: RwLock<FleetState>,
    pub(crate) bus: EventBus,
    pub(crate) commands: CommandRegistry,
    sound: Box<dyn AlertSound>,
    lifecycle: Mutex<Option<Lifecycle>>,
}

/// Shared handle to the fleet store. Cloning is cheap.
#[derive(Clone)]
pub struct FleetStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl FleetStore {
    pub fn new(config: StoreConfig, sound: Box<dyn AlertSound>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = FleetState::initial(&config, rng);
        let bus = EventBus::new(config.event_capacity);

        info!(
            "Fleet store created with {} drones and {} ground bots",
            state.drones.len(),
            state.ground_bots.len()
        );

        Self {
            inner: Arc::new(StoreInner {
                config,
                state: RwLock::new(state),
                bus,
                commands: CommandRegistry::new(),
                sound,
                lifecycle: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Spawn the tick loop. The first tick fires one interval after start.
    /// Returns false if already running.
    pub fn start(&self) -> bool {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.is_some() {
            return false;
        }

        let period = self.inner.config.tick_interval.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let store = self.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        store.tick();
                    }
                }
            }

            debug!("Tick loop exited");
        });

        *lifecycle = Some(Lifecycle { token, handle });
        info!("Fleet simulation started (tick every {:?})", period);
        true
    }

    /// Stop the tick loop and cancel every in-flight command
    pub async fn stop(&self) {
        let lifecycle = self.inner.lifecycle.lock().take();

        if let Some(Lifecycle { token, handle }) = lifecycle {
            token.cancel();
            if let Err(e) = handle.await {
                warn!("Tick loop ended abnormally: {}", e);
            }
            info!("Fleet simulation stopped");
        }

        let cancelled = self.inner.commands.cancel_all();
        if cancelled > 0 {
            debug!("Cancelled {} in-flight commands", cancelled);
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().is_some()
    }

    // ========================================================================
    // TICK
    // ========================================================================

    /// Advance the simulation one step. Returns the alerts raised by it.
    pub fn tick(&self) -> Vec<Alert> {
        let config = &self.inner.config;
        let mut events = Vec::new();
        let raised;

        {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            state.ticks += 1;
            let now = Utc::now();

            let drones = generator::advance_tick(&state.drones, &mut state.rng);
            status_changes(&state.drones, &drones, &mut events);
            state.drones = drones;
            state.history.record_all(&state.drones, now);

            let bots = generator::advance_tick(&state.ground_bots, &mut state.rng);
            status_changes(&state.ground_bots, &bots, &mut events);
            state.ground_bots = bots;
            state.history.record_all(&state.ground_bots, now);

            if state
                .rng
                .gen_bool(config.weather_update_probability.clamp(0.0, 1.0))
            {
                state.weather = generator::drift_weather(&state.weather, &mut state.rng);
                events.push(Event::weather_updated(state.weather.clone()));
            }

            let agents = state.agents();

            if state
                .rng
                .gen_bool(config.status_log_probability.clamp(0.0, 1.0))
            {
                if let Some(log) = generator::random_status_log(&agents, &mut state.rng) {
                    if log.severity == LogSeverity::Critical {
                        events.push(Event::notification(
                            Notification::new("Critical Status Update", log.message.clone())
                                .destructive(),
                        ));
                    }
                    events.push(Event::status_logged(log.clone()));
                    state.push_status_log(log, config.status_log_capacity);
                }
            }

            let known = state.alerts.len();
            state.alerts = alerts::evaluate(&agents, &state.alerts);
            raised = state.alerts[known..].to_vec();

            events.insert(
                0,
                Event::fleet_updated(
                    state.ticks,
                    state.drones.clone(),
                    state.ground_bots.clone(),
                ),
            );
            debug!("Tick {} complete, {} new alerts", state.ticks, raised.len());
        }

        for alert in &raised {
            let mut toast = Notification::new(format!("{} Alert", alert.alert_type), &alert.message);
            if alert.severity == AlertSeverity::Critical {
                toast = toast.destructive().audible();
            }
            events.push(Event::alert_raised(alert.clone()));
            events.push(Event::notification(toast));
        }

        self.inner.bus.publish_batch(events);

        // One cue per critical alert
        for alert in raised.iter().filter(|a| a.severity == AlertSeverity::Critical) {
            if let Err(e) = self.inner.sound.play() {
                warn!("Alert sound failed for {}: {}", alert.id, e);
            }
        }

        raised
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    pub fn snapshot(&self) -> FleetSnapshot {
        let state = self.inner.state.read();
        state.snapshot(self.inner.commands.len())
    }

    pub fn agent(&self, id: &AgentId) -> Option<Agent> {
        self.inner.state.read().agent(id).cloned()
    }

    pub fn battery_history(&self, id: &AgentId) -> Vec<BatterySample> {
        self.inner.state.read().history.battery_for(id)
    }

    pub fn sensor_history(&self, id: &AgentId) -> Vec<SensorSample> {
        self.inner.state.read().history.sensors_for(id)
    }

    /// Select an agent, or clear the selection with `None`.
    /// Unknown ids leave the selection unchanged and return false.
    pub fn select_agent(&self, id: Option<AgentId>) -> bool {
        {
            let mut state = self.inner.state.write();
            if let Some(id) = &id {
                if state.agent(id).is_none() {
                    debug!("Ignoring selection of unknown agent {}", id);
                    return false;
                }
            }
            state.selected = id.clone();
        }

        self.inner.bus.publish(Event::selection_changed(id));
        true
    }

    /// Mark an alert acknowledged. Returns false if it does not exist.
    pub fn acknowledge_alert(&self, id: &AlertId) -> bool {
        let mut events = Vec::new();
        {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;

            let Some(alert) = state.alerts.iter_mut().find(|a| &a.id == id) else {
                debug!("Ignoring acknowledgment of unknown alert {}", id);
                return false;
            };

            if !alert.acknowledged {
                alert.acknowledged = true;
                events.push(Event::alert_acknowledged(alert.clone()));
            }

            let alert = alert.clone();
            let agent_type = state
                .agent(&alert.agent_id)
                .map(Agent::agent_type)
                .unwrap_or(AgentType::System);
            let log = StatusLog::info(
                alert.agent_id.clone(),
                agent_type,
                format!("Alert acknowledged: {} - {}", alert.alert_type, alert.message),
            );

            events.push(Event::status_logged(log.clone()));
            state.push_status_log(log, self.inner.config.status_log_capacity);
        }

        info!("Alert {} acknowledged", id);
        self.inner.bus.publish_batch(events);
        true
    }

    /// Move a human report one step toward resolved.
    /// Returns the new status, or `None` if the report does not exist.
    pub fn acknowledge_human_report(&self, id: &ReportId) -> Option<ReportStatus> {
        let updated = {
            let mut state = self.inner.state.write();
            let report = state.human_reports.iter_mut().find(|r| &r.id == id)?;

            let next = report.status.next();
            if next == report.status {
                return Some(next);
            }
            report.status = next;
            report.clone()
        };

        info!("Report {} is now {:?}", id, updated.status);
        let status = updated.status;
        self.inner.bus.publish(Event::report_updated(updated));
        Some(status)
    }

    /// Remove an agent along with its history and in-flight commands
    pub fn remove_agent(&self, id: &AgentId) -> bool {
        let cancelled = {
            let mut state = self.inner.state.write();
            let before = state.drones.len() + state.ground_bots.len();
            state.drones.retain(|a| &a.id != id);
            state.ground_bots.retain(|a| &a.id != id);
            if state.drones.len() + state.ground_bots.len() == before {
                return false;
            }

            state.history.remove(id);
            if state.selected.as_ref() == Some(id) {
                state.selected = None;
            }
            self.inner.commands.cancel_agent(id)
        };

        info!("Agent {} removed ({} commands cancelled)", id, cancelled);
        self.inner.bus.publish(Event::agent_removed(id.clone()));
        true
    }

    /// Regenerate the fleet and cancel every in-flight command
    pub fn reset(&self) {
        let count = {
            let mut state = self.inner.state.write();
            self.inner.commands.cancel_all();
            let seed = state.rng.gen_range(0..u64::MAX);
            *state = FleetState::initial(&self.inner.config, StdRng::seed_from_u64(seed));
            state.drones.len() + state.ground_bots.len()
        };

        info!("Simulation reset with {} agents", count);
        self.inner.bus.clear_history();
        self.inner.bus.publish(Event::simulation_reset(count));
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    #[cfg(test)]
    pub(crate) fn update_agent(&self, id: &AgentId, f: impl FnOnce(&mut Agent)) {
        let mut guard = self.inner.state.write();
        let state = &mut *guard;
        if let Some(agent) = state
            .drones
            .iter_mut()
            .chain(state.ground_bots.iter_mut())
            .find(|a| &a.id == id)
        {
            f(agent);
        }
    }
}

fn status_changes(before: &[Agent], after: &[Agent], events: &mut Vec<Event>) {
    for (old, new) in before.iter().zip(after) {
        if old.status != new.status {
            events.push(Event::agent_status_changed(
                new.id.clone(),
                old.status,
                new.status,
            ));
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::{MockAlertSound, SoundError};
    use crate::Silent;
    use fleet_core::{AgentStatus, AlertType, EventType, SensorReadings};

    fn config() -> StoreConfig {
        StoreConfig {
            seed: Some(7),
            ..StoreConfig::default()
        }
    }

    fn calm_store(config: StoreConfig, sound: Box<dyn AlertSound>) -> FleetStore {
        let store = FleetStore::new(config, sound);
        for agent in store.snapshot().agents() {
            store.update_agent(&agent.id, |a| {
                a.set_battery(90.0);
                a.status = AgentStatus::Maintenance;
                a.sensors = SensorReadings::new(20.0, 0.0, None);
            });
        }
        store
    }

    #[test]
    fn test_initial_state() {
        let snapshot = FleetStore::new(config(), Box::new(Silent)).snapshot();

        assert_eq!(snapshot.drones.len(), 5);
        assert_eq!(snapshot.ground_bots.len(), 2);
        assert_eq!(snapshot.alerts.len(), 3);
        assert_eq!(snapshot.gis_features.len(), 3);
        assert_eq!(snapshot.battery_history.len(), 7);
        assert!(snapshot.battery_history.values().all(|s| s.len() == 1));
        assert!(snapshot.selected_agent_id.is_none());
    }

    #[test]
    fn test_without_demo_data() {
        let store = FleetStore::new(
            StoreConfig {
                seed_demo_data: false,
                fleet_size: 3,
                ..config()
            },
            Box::new(Silent),
        );
        let snapshot = store.snapshot();

        assert_eq!(snapshot.drones.len(), 3);
        assert!(snapshot.ground_bots.is_empty());
        assert!(snapshot.alerts.is_empty());
        assert!(snapshot.status_logs.is_empty());
    }

    #[test]
    fn test_tick_respects_invariants() {
        let store = FleetStore::new(config(), Box::new(Silent));

        for _ in 0..200 {
            let before = store.snapshot();
            store.tick();
            let after = store.snapshot();

            for agent in after.agents() {
                assert!((0.0..=100.0).contains(&agent.battery_level));
                let old = before.agent(&agent.id).unwrap();
                if !old.status.is_mobile() {
                    assert_eq!(old.position, agent.position);
                    assert_eq!(old.battery_level, agent.battery_level);
                }
                if old.status != AgentStatus::Operational {
                    assert_ne!(agent.status, AgentStatus::Operational);
                }
            }
            assert!(after.status_logs.len() <= 50);
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.stats.ticks, 200);
        assert!(snapshot.battery_history.values().all(|s| s.len() <= 100));
    }

    #[test]
    fn test_low_battery_scenario() {
        let store = FleetStore::new(
            StoreConfig {
                seed_demo_data: false,
                ..config()
            },
            Box::new(Silent),
        );
        for agent in store.snapshot().agents() {
            store.update_agent(&agent.id, |a| {
                a.set_battery(90.0);
                a.status = AgentStatus::Maintenance;
                a.sensors = SensorReadings::new(20.0, 0.0, None);
            });
        }
        store.update_agent(&AgentId::new("drone-3"), |a| a.set_battery(8.0));

        let raised = store.tick();

        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].agent_id.as_str(), "drone-3");
        assert_eq!(raised[0].alert_type, AlertType::LowBattery);
        assert_eq!(raised[0].severity, AlertSeverity::Warning);

        // Still low, still live: no duplicate
        assert!(store.tick().is_empty());

        assert!(store.acknowledge_alert(&raised[0].id));
        let again = store.tick();
        assert_eq!(again.len(), 1);
        assert_ne!(again[0].id, raised[0].id);
    }

    #[test]
    fn test_acknowledge_alert() {
        let store = FleetStore::new(config(), Box::new(Silent));
        let mut rx = store.subscribe();
        let id = AlertId::new("alert-2");

        assert!(store.acknowledge_alert(&id));
        assert!(store.acknowledge_alert(&id));
        assert!(!store.acknowledge_alert(&AlertId::new("alert-404")));

        let snapshot = store.snapshot();
        assert!(snapshot.alerts.iter().find(|a| a.id == id).unwrap().acknowledged);
        assert_eq!(
            snapshot.status_logs[0].message,
            "Alert acknowledged: High Temperature - Temperature exceeds normal operating range"
        );

        let first = rx.try_recv().unwrap();
        assert_eq!(first.event_type, EventType::AlertAcknowledged);
        let acked: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| e.event_type == EventType::AlertAcknowledged)
            .collect();
        assert!(acked.is_empty());
    }

    #[test]
    fn test_human_report_steps() {
        let store = FleetStore::new(config(), Box::new(Silent));
        let id = ReportId::new("report-1");

        assert_eq!(
            store.acknowledge_human_report(&id),
            Some(ReportStatus::InProgress)
        );
        assert_eq!(
            store.acknowledge_human_report(&id),
            Some(ReportStatus::Resolved)
        );
        assert_eq!(
            store.acknowledge_human_report(&id),
            Some(ReportStatus::Resolved)
        );
        assert_eq!(
            store.acknowledge_human_report(&ReportId::new("report-404")),
            None
        );
    }

    #[test]
    fn test_selection() {
        let store = FleetStore::new(config(), Box::new(Silent));

        assert!(store.select_agent(Some(AgentId::new("bot-2"))));
        assert!(!store.select_agent(Some(AgentId::new("ghost"))));
        assert_eq!(
            store.snapshot().selected_agent_id,
            Some(AgentId::new("bot-2"))
        );

        assert!(store.remove_agent(&AgentId::new("bot-2")));
        assert!(store.snapshot().selected_agent_id.is_none());
        assert!(!store.remove_agent(&AgentId::new("bot-2")));

        assert!(store.select_agent(None));
    }

    #[test]
    fn test_status_log_cap() {
        let store = FleetStore::new(
            StoreConfig {
                status_log_probability: 1.0,
                ..config()
            },
            Box::new(Silent),
        );

        for _ in 0..80 {
            store.tick();
            store.acknowledge_alert(&AlertId::new("alert-1"));
        }

        assert_eq!(store.snapshot().status_logs.len(), 50);
    }

    #[test]
    fn test_sound_failure_is_swallowed() {
        let mut sound = MockAlertSound::new();
        sound
            .expect_play()
            .times(1)
            .returning(|| Err(SoundError::Unavailable("muted".into())));

        let store = calm_store(
            StoreConfig {
                seed_demo_data: false,
                ..config()
            },
            Box::new(sound),
        );
        store.update_agent(&AgentId::new("drone-1"), |a| a.set_battery(2.0));

        let raised = store.tick();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_sound_plays_per_critical_alert() {
        let mut sound = MockAlertSound::new();
        sound.expect_play().times(2).returning(|| Ok(()));

        let store = calm_store(
            StoreConfig {
                seed_demo_data: false,
                ..config()
            },
            Box::new(sound),
        );
        store.update_agent(&AgentId::new("drone-1"), |a| a.set_battery(2.0));
        store.update_agent(&AgentId::new("drone-2"), |a| {
            a.sensors = SensorReadings::new(20.0, 280.0, None);
        });

        let raised = store.tick();
        assert_eq!(raised.len(), 2);
        assert!(raised.iter().all(|a| a.severity == AlertSeverity::Critical));
    }

    #[test]
    fn test_reset_regenerates_fleet() {
        let store = FleetStore::new(config(), Box::new(Silent));
        store.remove_agent(&AgentId::new("drone-1"));
        store.tick();

        store.reset();
        let snapshot = store.snapshot();

        assert_eq!(snapshot.drones.len(), 5);
        assert_eq!(snapshot.stats.ticks, 0);
        assert!(snapshot.agent(&AgentId::new("drone-1")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_ticks_on_interval() {
        let store = FleetStore::new(config(), Box::new(Silent));

        assert!(store.start());
        assert!(!store.start());
        assert!(store.is_running());

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(store.snapshot().stats.ticks, 0);

        tokio::time::sleep(Duration::from_millis(6200)).await;
        assert_eq!(store.snapshot().stats.ticks, 3);

        store.stop().await;
        assert!(!store.is_running());

        tokio::time::sleep(Duration::from_millis(9000)).await;
        assert_eq!(store.snapshot().stats.ticks, 3);
    }
}
