//! Asynchronous contribution generation.
//!
//! A CONTRIBUTE evaluation commits the agent's counter first and only then
//! hands a `GenerationTask` to the queue, so generation can never observe a
//! stale counter. The worker runs every task on its own tokio task:
//! generations for the same agent may overlap, and a failure is logged and
//! dropped (at most one delivery attempt per activation).
//!
//! ```text
//! evaluate() ── save agent ──► GenerationQueue.enqueue(task)
//!                                   │
//! DispatchWorker ◄──────────────────┘
//!     └─► spawn: respond() → save message → save thread → publish message:new
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::error::AgentError;
use super::models::AgentResponse;
use super::types::{AgentContext, AgentType};
use crate::common::{AgentId, ThreadId};
use crate::domains::threads::broadcast::publish_new_message;
use crate::domains::threads::models::Message;
use crate::kernel::{BaseCompletionService, FacilitatorDeps};

/// One contribution to generate.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub agent_id: AgentId,
    pub thread_id: ThreadId,
    /// The triggering message, which may not be persisted yet
    pub user_message: Option<Message>,
}

pub type GenerationReceiver = mpsc::UnboundedReceiver<GenerationTask>;

/// Sending side of the generation queue. Never blocks.
#[derive(Clone)]
pub struct GenerationQueue {
    tx: mpsc::UnboundedSender<GenerationTask>,
}

impl GenerationQueue {
    pub fn channel() -> (Self, GenerationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, task: GenerationTask) -> Result<()> {
        self.tx
            .send(task)
            .map_err(|_| anyhow!("Generation worker has shut down"))
    }
}

/// Long-running consumer of the generation queue.
pub struct DispatchWorker {
    deps: Arc<FacilitatorDeps>,
    rx: GenerationReceiver,
}

impl DispatchWorker {
    pub fn new(deps: Arc<FacilitatorDeps>, rx: GenerationReceiver) -> Self {
        Self { deps, rx }
    }

    /// Run until every queue sender is dropped.
    pub async fn run(mut self) {
        info!("Generation dispatch worker started");
        while let Some(task) = self.rx.recv().await {
            let deps = Arc::clone(&self.deps);
            tokio::spawn(async move {
                let _ = process_generation(&deps, task).await;
            });
        }
        info!("Generation dispatch worker stopped");
    }
}

/// Generate, persist and broadcast one task's contribution.
///
/// Always settles the agent's dispatch state. Errors are logged here and
/// returned only for callers that want to inspect them.
pub async fn process_generation(
    deps: &FacilitatorDeps,
    task: GenerationTask,
) -> Result<Vec<Message>, AgentError> {
    let agent_id = task.agent_id;
    let result = generate_and_post(deps, &task).await;
    deps.activity.end_dispatch(agent_id);

    match &result {
        Ok(posted) => info!(
            agent_id = %agent_id,
            thread_id = %task.thread_id,
            posted = posted.len(),
            "Agent contribution posted"
        ),
        Err(e) => error!(
            agent_id = %agent_id,
            thread_id = %task.thread_id,
            error = %e,
            "Agent contribution generation failed"
        ),
    }

    result
}

async fn generate_and_post(
    deps: &FacilitatorDeps,
    task: &GenerationTask,
) -> Result<Vec<Message>, AgentError> {
    let agent = deps
        .store
        .find_agent(task.agent_id)
        .await?
        .ok_or_else(|| AgentError::GenerationFailure {
            agent_id: task.agent_id,
            reason: "agent no longer exists".to_string(),
        })?;
    let mut thread = deps
        .store
        .find_thread(task.thread_id)
        .await?
        .ok_or(AgentError::MissingThread(task.thread_id))?;
    let agent_type = agent.resolve_type(&deps.registry)?;

    // Ingestion may have persisted the triggering message in the meantime
    let in_flight = task
        .user_message
        .as_ref()
        .filter(|m| !thread.contains_message(m.id));

    let responses = {
        let human_message_count = thread.human_message_count() + i32::from(in_flight.is_some());
        let ctx = AgentContext::new(
            &agent,
            agent_type,
            &thread,
            deps.completion.as_ref(),
            human_message_count,
        );
        agent_type
            .behavior
            .respond(&ctx, in_flight)
            .await
            .map_err(|e| AgentError::GenerationFailure {
                agent_id: agent.id,
                reason: format!("{:#}", e),
            })?
    };

    for response in &responses {
        validate_response(agent_type, deps.completion.as_ref(), response)?;
    }

    if responses.is_empty() {
        warn!(agent_id = %agent.id, "Contribution produced no messages");
    }

    let mut posted = Vec::with_capacity(responses.len());
    for response in responses {
        let message = Message::from_agent(
            thread.id,
            agent.pseudonym(),
            response.message,
            response.visible,
        );
        deps.store.save_message(&message).await?;
        thread.push_message(message.clone());
        deps.store.save_thread(&thread).await?;
        publish_new_message(&deps.stream_hub, &thread, &message).await;
        posted.push(message);
    }

    Ok(posted)
}

fn validate_response(
    agent_type: &AgentType,
    completion: &dyn BaseCompletionService,
    response: &AgentResponse,
) -> Result<(), AgentError> {
    let invalid = |reason: &str| AgentError::InvalidResponse {
        agent_type: agent_type.id.to_string(),
        reason: reason.to_string(),
    };

    if response.message.trim().is_empty() {
        return Err(invalid("message is empty"));
    }
    if !agent_type
        .behavior
        .is_within_limit(agent_type, completion, &response.message)
    {
        return Err(invalid("message exceeds the agent type's token limit"));
    }
    Ok(())
}
