//! Periodic timer dispatch: a fired job becomes `evaluate(None)`.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::error::AgentError;
use super::models::Evaluation;
use super::runtime::AgentRuntime;
use crate::common::AgentId;
use crate::kernel::scheduler::TickReceiver;
use crate::kernel::FacilitatorDeps;

/// Evaluate the agent named by a timer payload.
///
/// Returns `Ok(None)` when the agent is gone, or when its thread is gone (the
/// agent is then deleted and its timer cancelled).
pub async fn handle_tick(
    deps: &Arc<FacilitatorDeps>,
    agent_id: AgentId,
) -> Result<Option<Evaluation>, AgentError> {
    let Some(agent) = deps.store.find_agent(agent_id).await? else {
        warn!(agent_id = %agent_id, "Timer fired for an unknown agent");
        return Ok(None);
    };

    let Some(thread) = deps.store.find_thread(agent.thread_id).await? else {
        warn!(
            agent_id = %agent_id,
            thread_id = %agent.thread_id,
            "Thread no longer exists, deleting orphaned agent"
        );
        deps.scheduler.cancel(&agent.timer_job_name()).await?;
        deps.store.delete_agent(agent_id).await?;
        deps.activity.forget(agent_id);
        return Ok(None);
    };

    let mut runtime = AgentRuntime::new(agent, Arc::clone(deps));
    runtime.evaluate(&thread, None).await.map(Some)
}

/// Long-running consumer of scheduler ticks.
pub struct TickWorker {
    deps: Arc<FacilitatorDeps>,
    rx: TickReceiver,
}

impl TickWorker {
    pub fn new(deps: Arc<FacilitatorDeps>, rx: TickReceiver) -> Self {
        Self { deps, rx }
    }

    /// Run until the scheduler drops its sender.
    pub async fn run(mut self) {
        info!("Agent tick worker started");
        while let Some(payload) = self.rx.recv().await {
            let deps = Arc::clone(&self.deps);
            tokio::spawn(async move {
                if let Err(e) = handle_tick(&deps, payload.agent_id).await {
                    error!(agent_id = %payload.agent_id, error = %e, "Periodic evaluation failed");
                }
            });
        }
        info!("Agent tick worker stopped");
    }
}
