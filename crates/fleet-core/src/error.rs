//! Error types for the rescue fleet model

use thiserror::Error;

/// Core error type for the rescue fleet model
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Human report not found: {0}")]
    ReportNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown value for {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl CoreError {
    pub fn agent_not_found(id: impl Into<String>) -> Self {
        Self::AgentNotFound(id.into())
    }

    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn unknown_variant(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
