//! Submit message action - runs a participant's message past the thread's agents

use std::sync::Arc;

use tracing::{error, info};

use crate::common::ThreadId;
use crate::domains::agents::{AgentError, AgentRuntime};
use crate::domains::threads::broadcast::publish_new_message;
use crate::domains::threads::models::Message;
use crate::kernel::FacilitatorDeps;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Persisted and broadcast
    Accepted { message: Message },
    /// Refused by an agent; nothing was persisted
    Rejected { suggestion: Option<String> },
}

/// Submit `body` to a thread under `pseudonym`.
///
/// Every agent of the thread that reacts to messages evaluates it in
/// provisioning order. The first REJECT stops the pass and the message is
/// dropped with no agent state changed. Otherwise the message is stored,
/// visible only if every agent allowed it, each agent's decision is applied,
/// and the message is published as `message:new`.
///
/// Calls for the same thread must not overlap.
pub async fn submit_message(
    deps: &Arc<FacilitatorDeps>,
    thread_id: ThreadId,
    pseudonym: &str,
    body: &str,
) -> Result<SubmissionOutcome, AgentError> {
    let mut thread = deps
        .store
        .find_thread(thread_id)
        .await?
        .ok_or(AgentError::MissingThread(thread_id))?;

    let mut message = Message::from_participant(thread_id, pseudonym, body);
    let agents = deps.store.list_agents_for_thread(thread_id).await?;

    let mut decided = Vec::with_capacity(agents.len());
    for agent in agents {
        let agent_type = agent.resolve_type(&deps.registry)?;
        if !agent_type.reacts_to_messages {
            continue;
        }

        let runtime = AgentRuntime::new(agent, Arc::clone(deps));
        let activation = runtime.decide(&thread, Some(&message)).await?;

        if activation.evaluation.is_reject() {
            info!(
                thread_id = %thread_id,
                agent_id = %runtime.agent().id,
                "Message rejected by agent"
            );
            return Ok(SubmissionOutcome::Rejected {
                suggestion: activation.evaluation.suggestion,
            });
        }
        message.visible &= activation.evaluation.user_contribution_visible;
        decided.push((runtime, activation));
    }

    deps.store.save_message(&message).await?;
    thread.push_message(message.clone());
    deps.store.save_thread(&thread).await?;

    // Already stored: agent failures from here on are only logged
    for (mut runtime, activation) in decided {
        if let Err(e) = runtime.commit(&thread, Some(&message), activation).await {
            error!(
                thread_id = %thread_id,
                agent_id = %runtime.agent().id,
                error = %e,
                "Failed to apply agent evaluation"
            );
        }
    }

    publish_new_message(&deps.stream_hub, &thread, &message).await;

    info!(
        thread_id = %thread_id,
        message_id = %message.id,
        visible = message.visible,
        "Message accepted"
    );
    Ok(SubmissionOutcome::Accepted { message })
}
