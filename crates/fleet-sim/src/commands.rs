//! Operator command dispatch
//!
//! A dispatched command is recorded as `Sent` immediately, then walks
//! `Sent -> Acknowledged -> Completed` on timers. Every in-flight command has
//! a ticket in the [`CommandRegistry`]; the timers consult it before each
//! transition, so removing an agent, resetting the simulation or stopping the
//! store leaves the command exactly where it was.

use chrono::Utc;
use dashmap::DashMap;
use fleet_core::{
    AgentId, AgentStatus, CommandLog, CommandLogId, CommandStatus, Event, FleetCommand,
    Notification, StatusLog,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::FleetStore;

/// Cancellation handle of one in-flight command
#[derive(Debug, Clone)]
pub struct CommandTicket {
    pub agent_id: AgentId,
    token: CancellationToken,
}

/// In-flight commands keyed by command id
#[derive(Debug, Default)]
pub struct CommandRegistry {
    tickets: DashMap<CommandLogId, CommandTicket>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a command and hand back the token its timers watch
    pub fn register(&self, id: CommandLogId, agent_id: AgentId) -> CancellationToken {
        let token = CancellationToken::new();
        self.tickets.insert(
            id,
            CommandTicket {
                agent_id,
                token: token.clone(),
            },
        );
        token
    }

    /// Registered and not cancelled
    pub fn is_live(&self, id: &CommandLogId) -> bool {
        self.tickets
            .get(id)
            .map(|t| !t.token.is_cancelled())
            .unwrap_or(false)
    }

    /// Forget a command that reached a terminal state
    pub fn finish(&self, id: &CommandLogId) {
        self.tickets.remove(id);
    }

    /// Cancel every command targeting `agent_id`; returns how many were cancelled
    pub fn cancel_agent(&self, agent_id: &AgentId) -> usize {
        let mut cancelled = 0;
        self.tickets.retain(|_, ticket| {
            if &ticket.agent_id == agent_id {
                ticket.token.cancel();
                cancelled += 1;
                false
            } else {
                true
            }
        });
        cancelled
    }

    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.tickets.retain(|_, ticket| {
            ticket.token.cancel();
            cancelled += 1;
            false
        });
        cancelled
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

impl FleetStore {
    /// Dispatch a command to an agent.
    ///
    /// Unknown agents and missing parameters for `Move to Location` or
    /// `Scan Area` are ignored and yield `None`. Must be called from within a
    /// Tokio runtime.
    pub fn send_command(
        &self,
        agent_id: &AgentId,
        command: FleetCommand,
        parameters: Option<String>,
    ) -> Option<CommandLogId> {
        let parameters = parameters
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if command.requires_parameters() && parameters.is_none() {
            debug!("Ignoring {} for {}: parameters required", command, agent_id);
            return None;
        }

        let (log, status_log, agent_name, token) = {
            let mut state = self.inner.state.write();
            let Some(agent) = state.agent(agent_id) else {
                debug!("Ignoring {} for unknown agent {}", command, agent_id);
                return None;
            };
            let agent_type = agent.agent_type();
            let agent_name = agent.name.clone();

            let log = CommandLog::sent(agent_id.clone(), command, parameters.clone());
            let message = match &parameters {
                Some(p) => format!("Command sent: {} with parameters: {}", command, p),
                None => format!("Command sent: {}", command),
            };
            let status_log = StatusLog::info(agent_id.clone(), agent_type, message);

            state.command_logs.push(log.clone());
            state.push_status_log(status_log.clone(), self.inner.config.status_log_capacity);

            // Registered under the lock so remove_agent and reset always see it
            let token = self
                .inner
                .commands
                .register(log.id.clone(), agent_id.clone());
            (log, status_log, agent_name, token)
        };

        info!("Command {} sent to {} ({})", command, agent_id, log.id);

        self.inner.bus.publish_batch(vec![
            Event::command(log.clone()),
            Event::status_logged(status_log),
            Event::notification(Notification::new(
                "Command Sent",
                format!("{} command sent to {}", command, agent_name),
            )),
        ]);

        self.spawn_command_lifecycle(log.id.clone(), token);
        Some(log.id)
    }

    fn spawn_command_lifecycle(&self, id: CommandLogId, token: CancellationToken) {
        let store = self.clone();
        let ack_delay = self.inner.config.ack_delay;
        let completion_delay = self.inner.config.completion_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(ack_delay) => {}
            }
            if !store.advance_command(&id, CommandStatus::Acknowledged) {
                return;
            }

            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(completion_delay) => {}
            }
            store.advance_command(&id, CommandStatus::Completed);
        });
    }

    /// Apply one lifecycle step if the command is still live.
    ///
    /// A command that cannot advance loses its ticket.
    fn advance_command(&self, id: &CommandLogId, next: CommandStatus) -> bool {
        let mut events = Vec::new();
        {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;

            if !self.inner.commands.is_live(id) {
                debug!("Command {} no longer live, skipping {}", id, next);
                self.inner.commands.finish(id);
                return false;
            }

            let Some(log) = state.command_logs.iter_mut().find(|c| &c.id == id) else {
                debug!("Command {} no longer logged", id);
                self.inner.commands.finish(id);
                return false;
            };
            let Some(agent) = state
                .drones
                .iter_mut()
                .chain(state.ground_bots.iter_mut())
                .find(|a| a.id == log.agent_id)
            else {
                debug!("Command {} target {} is gone", id, log.agent_id);
                self.inner.commands.finish(id);
                return false;
            };

            if let Err(e) = log.advance(next) {
                warn!("Command {} rejected transition: {}", id, e);
                self.inner.commands.finish(id);
                return false;
            }
            if next.is_terminal() {
                self.inner.commands.finish(id);
            }

            let verb = match next {
                CommandStatus::Acknowledged => "acknowledged",
                CommandStatus::Completed => "completed",
                _ => "updated",
            };
            let status_log = StatusLog::info(
                agent.id.clone(),
                agent.agent_type(),
                format!("{} {} command: {}", agent.name, verb, log.command),
            );

            if next == CommandStatus::Completed && log.command == FleetCommand::ReturnToBase {
                let previous = agent.status;
                agent.status = AgentStatus::Maintenance;
                agent.last_updated = Utc::now();
                if previous != AgentStatus::Maintenance {
                    events.push(Event::agent_status_changed(
                        agent.id.clone(),
                        previous,
                        AgentStatus::Maintenance,
                    ));
                }
            }

            events.push(Event::command(log.clone()));
            events.push(Event::status_logged(status_log.clone()));
            state.push_status_log(status_log, self.inner.config.status_log_capacity);
        }

        debug!("Command {} -> {}", id, next);
        self.inner.bus.publish_batch(events);
        true
    }
}

// ============================================================================
// TESTS
// ============================================================================
