//! Agent runtime: one instance per agent-thread pairing.
//!
//! Owns the activation protocol for a single agent:
//!
//! 1. count human messages (plus the in-flight one, if any)
//! 2. short-circuit to OK when nothing new happened or the threshold is not met
//! 3. delegate to the agent type's `evaluate`
//! 4. debounce the timer on a reactive CONTRIBUTE
//! 5. advance and persist the counter unless the result is REJECT
//! 6. hand CONTRIBUTE activations to the generation queue
//!
//! Steps 1-3 (`decide`) have no side effects. Steps 4-6 (`commit`) apply a
//! decision, so ingestion can hold every agent's decision until none of them
//! rejected the message.
//!
//! Concurrent `evaluate` calls for the same agent are the caller's problem;
//! message ingestion serializes them per thread.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::dispatch::GenerationTask;
use super::error::AgentError;
use super::models::{Agent, Evaluation, EvaluationAction};
use super::types::{AgentContext, AgentType};
use crate::domains::threads::models::{Message, Thread};
use crate::kernel::{FacilitatorDeps, TimerPayload};

/// How `initialize` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeOutcome {
    Initialized,
    /// The agent's thread was gone, so the agent was deleted
    Removed,
}

/// A decided activation that has not been applied yet.
#[derive(Debug, Clone)]
pub struct Activation {
    pub evaluation: Evaluation,
    human_message_count: i32,
    /// False when the runtime answered OK without asking the agent type
    delegated: bool,
}

pub struct AgentRuntime {
    agent: Agent,
    deps: Arc<FacilitatorDeps>,
}

impl AgentRuntime {
    pub fn new(agent: Agent, deps: Arc<FacilitatorDeps>) -> Self {
        Self { agent, deps }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Run the type's startup hook and register the periodic timer.
    ///
    /// An agent whose thread no longer exists is deleted and reported as
    /// `Removed` instead of failing.
    pub async fn initialize(&mut self) -> Result<InitializeOutcome, AgentError> {
        let Some(thread) = self.deps.store.find_thread(self.agent.thread_id).await? else {
            warn!(
                agent_id = %self.agent.id,
                thread_id = %self.agent.thread_id,
                "Thread no longer exists, deleting orphaned agent"
            );
            self.remove().await?;
            return Ok(InitializeOutcome::Removed);
        };

        let agent_type = self.agent.resolve_type(&self.deps.registry)?;
        {
            let ctx = self.context(agent_type, &thread, thread.human_message_count());
            agent_type.behavior.initialize(&ctx).await?;
        }

        // Clears any timer left by an earlier initialization
        self.schedule_timer(agent_type, true).await?;
        self.deps.activity.mark_idle(self.agent.id);

        info!(
            agent_id = %self.agent.id,
            agent_type = agent_type.id,
            thread_id = %thread.id,
            "Agent initialized"
        );
        Ok(InitializeOutcome::Initialized)
    }

    /// Run one activation. `user_message` is `None` for periodic ticks and
    /// may not be persisted yet.
    pub async fn evaluate(
        &mut self,
        thread: &Thread,
        user_message: Option<&Message>,
    ) -> Result<Evaluation, AgentError> {
        let activation = self.decide(thread, user_message).await?;
        self.commit(thread, user_message, activation).await
    }

    /// Decide what to do about an activation without touching the counter,
    /// the timer or the generation queue.
    pub async fn decide(
        &self,
        thread: &Thread,
        user_message: Option<&Message>,
    ) -> Result<Activation, AgentError> {
        let agent_type = self.agent.resolve_type(&self.deps.registry)?;
        let human_message_count = thread.human_message_count() + i32::from(user_message.is_some());

        if let Some(reason) = self.short_circuit(agent_type, human_message_count, user_message) {
            debug!(
                agent_id = %self.agent.id,
                human_message_count,
                last_active_message_count = self.agent.last_active_message_count,
                reason,
                "Activation short-circuited"
            );
            return Ok(Activation {
                evaluation: Evaluation::ok(user_message),
                human_message_count,
                delegated: false,
            });
        }

        let evaluation = {
            let ctx = self.context(agent_type, thread, human_message_count);
            agent_type.behavior.evaluate(&ctx, user_message).await?
        };
        validate_evaluation(agent_type, &evaluation, user_message)?;

        debug!(
            agent_id = %self.agent.id,
            action = ?evaluation.action,
            human_message_count,
            "Agent evaluated"
        );

        Ok(Activation {
            evaluation,
            human_message_count,
            delegated: true,
        })
    }

    /// Apply a decision from `decide`: reset the timer on a reactive
    /// CONTRIBUTE, advance and persist the counter unless REJECT, then queue
    /// the contribution. `user_message` must be the message `decide` saw.
    pub async fn commit(
        &mut self,
        thread: &Thread,
        user_message: Option<&Message>,
        activation: Activation,
    ) -> Result<Evaluation, AgentError> {
        let Activation {
            evaluation,
            human_message_count,
            delegated,
        } = activation;
        if !delegated {
            return Ok(evaluation);
        }

        if evaluation.action == EvaluationAction::Contribute && user_message.is_some() {
            let agent_type = self.agent.resolve_type(&self.deps.registry)?;
            self.schedule_timer(agent_type, false).await?;
        }

        if !evaluation.is_reject() {
            self.agent.last_active_message_count = human_message_count;
            self.agent.touch();
            self.deps.store.save_agent(&self.agent).await?;
        }

        if evaluation.action == EvaluationAction::Contribute {
            self.dispatch(thread, user_message);
        }

        Ok(evaluation)
    }

    /// Whether `text` fits this agent's type.
    pub fn is_within_limit(&self, text: &str) -> Result<bool, AgentError> {
        let agent_type = self.agent.resolve_type(&self.deps.registry)?;
        Ok(agent_type
            .behavior
            .is_within_limit(agent_type, self.deps.completion.as_ref(), text))
    }

    /// Restart the periodic countdown at the full period.
    pub async fn reset_timer(&self) -> Result<(), AgentError> {
        let agent_type = self.agent.resolve_type(&self.deps.registry)?;
        self.schedule_timer(agent_type, false).await
    }

    fn short_circuit(
        &self,
        agent_type: &AgentType,
        human_message_count: i32,
        user_message: Option<&Message>,
    ) -> Option<&'static str> {
        let threshold = agent_type.min_new_messages?;
        let last_active = self.agent.last_active_message_count;

        if human_message_count == last_active {
            return Some("no new human messages");
        }
        if user_message.is_some() && human_message_count - last_active < threshold {
            return Some("below new message threshold");
        }
        None
    }

    fn context<'a>(
        &'a self,
        agent_type: &'a AgentType,
        thread: &'a Thread,
        human_message_count: i32,
    ) -> AgentContext<'a> {
        AgentContext::new(
            &self.agent,
            agent_type,
            thread,
            self.deps.completion.as_ref(),
            human_message_count,
        )
    }

    /// Cancel then re-register the agent's job. No-op for types without a timer.
    async fn schedule_timer(&self, agent_type: &AgentType, log: bool) -> Result<(), AgentError> {
        let Some(period) = agent_type.timer_duration()? else {
            return Ok(());
        };
        let job_name = self.agent.timer_job_name();

        self.deps.scheduler.cancel(&job_name).await?;
        self.deps
            .scheduler
            .every(period, &job_name, TimerPayload { agent_id: self.agent.id })
            .await?;

        if log {
            info!(agent_id = %self.agent.id, job_name = %job_name, ?period, "Agent timer registered");
        } else {
            debug!(agent_id = %self.agent.id, job_name = %job_name, "Agent timer reset");
        }
        Ok(())
    }

    fn dispatch(&self, thread: &Thread, user_message: Option<&Message>) {
        let agent_id = self.agent.id;
        self.deps.activity.begin_dispatch(agent_id);

        let task = GenerationTask {
            agent_id,
            thread_id: thread.id,
            user_message: user_message.cloned(),
        };
        if let Err(e) = self.deps.generation_queue.enqueue(task) {
            error!(agent_id = %agent_id, error = %e, "Failed to queue contribution");
            self.deps.activity.end_dispatch(agent_id);
        }
    }

    async fn remove(&self) -> Result<(), AgentError> {
        self.deps.store.delete_agent(self.agent.id).await?;
        self.deps.activity.forget(self.agent.id);
        Ok(())
    }
}

fn validate_evaluation(
    agent_type: &AgentType,
    evaluation: &Evaluation,
    user_message: Option<&Message>,
) -> Result<(), AgentError> {
    let invalid = |reason: &str| AgentError::InvalidEvaluation {
        agent_type: agent_type.id.to_string(),
        reason: reason.to_string(),
    };

    let echoed = evaluation.user_message.as_ref().map(|m| m.id);
    if echoed != user_message.map(|m| m.id) {
        return Err(invalid("userMessage does not match the triggering message"));
    }
    if evaluation.is_reject() && user_message.is_none() {
        return Err(invalid("REJECT requires a user message"));
    }
    Ok(())
}
