use thiserror::Error;

use crate::common::{AgentId, ThreadId};

/// Failures of agent registration, initialization, evaluation and dispatch.
#[derive(Debug, Error)]
pub enum AgentError {
    /// An agent type was registered without a required property.
    #[error("agent type `{agent_type}` is missing required capability `{key}`")]
    MissingCapability {
        agent_type: String,
        key: &'static str,
    },

    #[error("agent type `{0}` is already registered")]
    DuplicateAgentType(String),

    #[error("agent type `{agent_type}` has invalid timer period {period:?}: {reason}")]
    InvalidTimerPeriod {
        agent_type: String,
        period: String,
        reason: String,
    },

    #[error("agent type `{agent_type}` has invalid activation threshold {value}")]
    InvalidThreshold { agent_type: String, value: i32 },

    #[error("unknown agent type `{0}`")]
    UnknownAgentType(String),

    #[error("agent type `{agent_type}` returned an invalid evaluation: {reason}")]
    InvalidEvaluation { agent_type: String, reason: String },

    #[error("agent type `{agent_type}` returned an invalid response: {reason}")]
    InvalidResponse { agent_type: String, reason: String },

    #[error("thread {0} no longer exists")]
    MissingThread(ThreadId),

    #[error("generation failed for agent {agent_id}: {reason}")]
    GenerationFailure { agent_id: AgentId, reason: String },

    /// Storage, scheduler or behavior hook failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
