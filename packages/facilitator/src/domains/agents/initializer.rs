//! Cold-start initialization of every persisted agent.

use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::runtime::{AgentRuntime, InitializeOutcome};
use crate::kernel::FacilitatorDeps;

/// Initializations allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_INITIALIZATIONS: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitializationReport {
    pub initialized: usize,
    /// Orphaned agents deleted because their thread was gone
    pub removed: usize,
    pub failed: usize,
}

/// Initialize all agents, at most `max_concurrent` at a time, and wait for
/// every one to finish.
///
/// A failing agent is logged and counted; it does not stop the others. Only
/// failing to list agents is an error.
pub async fn initialize_all(
    deps: &Arc<FacilitatorDeps>,
    max_concurrent: usize,
) -> Result<InitializationReport> {
    let agents = deps.store.list_agents().await?;
    let total = agents.len();
    info!(total, max_concurrent, "Initializing agents");

    let outcomes: Vec<_> = stream::iter(agents)
        .map(|agent| {
            let deps = Arc::clone(deps);
            async move {
                let agent_id = agent.id;
                let mut runtime = AgentRuntime::new(agent, deps);
                (agent_id, runtime.initialize().await)
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut report = InitializationReport::default();
    for (agent_id, outcome) in outcomes {
        match outcome {
            Ok(InitializeOutcome::Initialized) => report.initialized += 1,
            Ok(InitializeOutcome::Removed) => report.removed += 1,
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "Agent initialization failed");
                report.failed += 1;
            }
        }
    }

    info!(
        initialized = report.initialized,
        removed = report.removed,
        failed = report.failed,
        "Agent initialization complete"
    );
    Ok(report)
}
