//! Agent type registry.
//!
//! Populated once at startup and read-only afterwards. Registration is a gate:
//! it rejects incomplete or inconsistent types and stores the rest unchanged.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = AgentTypeRegistry::new();
//! registry.register(civility::agent_type())?;
//!
//! let agent_type = registry.lookup("civility_moderator")?;
//! ```

use std::collections::HashMap;

use super::error::AgentError;
use super::types::AgentType;

#[derive(Debug, Default)]
pub struct AgentTypeRegistry {
    types: HashMap<&'static str, AgentType>,
}

impl AgentTypeRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Validate and store `agent_type`.
    ///
    /// Returns an error if:
    /// - a required text field is empty or the token budget is zero (`MissingCapability`)
    /// - the threshold is not positive (`InvalidThreshold`)
    /// - the timer period does not parse (`InvalidTimerPeriod`)
    /// - a timer-only type has no timer (`MissingCapability`)
    /// - the id is taken (`DuplicateAgentType`)
    pub fn register(&mut self, agent_type: AgentType) -> Result<&AgentType, AgentError> {
        validate(&agent_type)?;

        if self.types.contains_key(agent_type.id) {
            return Err(AgentError::DuplicateAgentType(agent_type.id.to_string()));
        }

        tracing::debug!(agent_type = agent_type.id, "Registered agent type");
        Ok(self.types.entry(agent_type.id).or_insert(agent_type))
    }

    pub fn lookup(&self, id: &str) -> Result<&AgentType, AgentError> {
        self.types
            .get(id)
            .ok_or_else(|| AgentError::UnknownAgentType(id.to_string()))
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.types.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn validate(agent_type: &AgentType) -> Result<(), AgentError> {
    let missing = |key: &'static str| AgentError::MissingCapability {
        agent_type: agent_type.id.to_string(),
        key,
    };

    if agent_type.id.trim().is_empty() {
        return Err(missing("id"));
    }
    if agent_type.name.trim().is_empty() {
        return Err(missing("name"));
    }
    if agent_type.description.trim().is_empty() {
        return Err(missing("description"));
    }
    if agent_type.max_tokens == 0 {
        return Err(missing("maxTokens"));
    }
    if let Some(value) = agent_type.min_new_messages {
        if value < 1 {
            return Err(AgentError::InvalidThreshold {
                agent_type: agent_type.id.to_string(),
                value,
            });
        }
    }
    agent_type.timer_duration()?;
    if !agent_type.reacts_to_messages && agent_type.timer_period.is_none() {
        // Would never activate
        return Err(missing("timerPeriod"));
    }

    Ok(())
}
