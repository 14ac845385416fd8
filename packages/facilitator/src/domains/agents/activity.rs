//! Per-agent runtime state.
//!
//! ```text
//! Uninitialized ──initialize──► Idle ──CONTRIBUTE──► Dispatching
//!                                ▲  ◄─OK/REJECT─┘        │
//!                                └──generation settles───┘
//! ```

use std::sync::Arc;

use dashmap::DashMap;

use crate::common::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Uninitialized,
    Idle,
    /// At least one generation is in flight
    Dispatching,
}

/// Shared map of agent id -> in-flight generation count.
#[derive(Clone, Default)]
pub struct ActivityTracker {
    in_flight: Arc<DashMap<AgentId, usize>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, agent_id: AgentId) -> AgentState {
        match self.in_flight.get(&agent_id).map(|n| *n) {
            None => AgentState::Uninitialized,
            Some(0) => AgentState::Idle,
            Some(_) => AgentState::Dispatching,
        }
    }

    pub fn in_flight(&self, agent_id: AgentId) -> usize {
        self.in_flight.get(&agent_id).map(|n| *n).unwrap_or(0)
    }

    pub fn mark_idle(&self, agent_id: AgentId) {
        self.in_flight.entry(agent_id).or_insert(0);
    }

    pub fn begin_dispatch(&self, agent_id: AgentId) {
        *self.in_flight.entry(agent_id).or_insert(0) += 1;
    }

    pub fn end_dispatch(&self, agent_id: AgentId) {
        if let Some(mut count) = self.in_flight.get_mut(&agent_id) {
            *count = count.saturating_sub(1);
        }
    }

    /// Drop all state for a deleted agent.
    pub fn forget(&self, agent_id: AgentId) {
        self.in_flight.remove(&agent_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatching_returns_to_idle_when_all_generations_settle() {
        let tracker = ActivityTracker::new();
        let id = AgentId::new();
        assert_eq!(tracker.state(id), AgentState::Uninitialized);

        tracker.mark_idle(id);
        tracker.begin_dispatch(id);
        tracker.begin_dispatch(id);
        assert_eq!(tracker.state(id), AgentState::Dispatching);

        tracker.end_dispatch(id);
        assert_eq!(tracker.state(id), AgentState::Dispatching);
        tracker.end_dispatch(id);
        assert_eq!(tracker.state(id), AgentState::Idle);
    }

    #[test]
    fn forget_resets_to_uninitialized() {
        let tracker = ActivityTracker::new();
        let id = AgentId::new();
        tracker.mark_idle(id);
        tracker.forget(id);
        assert_eq!(tracker.state(id), AgentState::Uninitialized);
    }
}
