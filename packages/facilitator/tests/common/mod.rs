// Common test utilities

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;

use std::sync::Arc;

use facilitator_core::domains::agents::{AgentType, AgentTypeRegistry};

/// Registry holding exactly `types`.
pub fn registry_of(types: impl IntoIterator<Item = AgentType>) -> AgentTypeRegistry {
    let mut registry = AgentTypeRegistry::new();
    for agent_type in types {
        registry
            .register(agent_type)
            .expect("test agent type must register");
    }
    registry
}

/// A scripted type plus the behavior handle for inspecting calls.
pub fn scripted(
    settings: ScriptedType,
    behavior: ScriptedBehavior,
) -> (AgentType, Arc<ScriptedBehavior>) {
    let behavior = Arc::new(behavior);
    (settings.build(Arc::clone(&behavior)), behavior)
}
