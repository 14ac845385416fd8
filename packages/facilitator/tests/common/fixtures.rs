//! Scripted agent types for exercising the runtime without a real model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use facilitator_core::domains::agents::{
    AgentBehavior, AgentContext, AgentResponse, AgentType, Evaluation, EvaluationAction,
};
use facilitator_core::domains::threads::Message;
use facilitator_core::kernel::prompt::variables;
use facilitator_core::kernel::BaseCompletionService;

pub const SCRIPTED_RESPOND_TEMPLATE: &str = "Conversation so far:\n{transcript}";

/// Behavior that always returns a fixed action and counts its calls.
pub struct ScriptedBehavior {
    action: EvaluationAction,
    user_visible: bool,
    /// Echo a fresh message instead of the triggering one
    echo_wrong_message: bool,
    fail_initialize: bool,
    /// Yield inside `initialize` so overlapping calls can be observed
    pause_initialize: bool,
    pub evaluations: AtomicUsize,
    pub initializations: AtomicUsize,
    initializing: AtomicUsize,
    peak_initializing: AtomicUsize,
}

impl ScriptedBehavior {
    pub fn new(action: EvaluationAction) -> Self {
        Self {
            action,
            user_visible: true,
            echo_wrong_message: false,
            fail_initialize: false,
            pause_initialize: false,
            evaluations: AtomicUsize::new(0),
            initializations: AtomicUsize::new(0),
            initializing: AtomicUsize::new(0),
            peak_initializing: AtomicUsize::new(0),
        }
    }

    pub fn hiding_user_message(mut self) -> Self {
        self.user_visible = false;
        self
    }

    pub fn echoing_wrong_message(mut self) -> Self {
        self.echo_wrong_message = true;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn pausing_initialize(mut self) -> Self {
        self.pause_initialize = true;
        self
    }

    /// Most `initialize` calls that were in flight at the same time
    pub fn peak_concurrent_initializations(&self) -> usize {
        self.peak_initializing.load(Ordering::SeqCst)
    }

    pub fn evaluation_count(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn initialization_count(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentBehavior for ScriptedBehavior {
    async fn initialize(&self, _ctx: &AgentContext<'_>) -> Result<()> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        let now = self.initializing.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_initializing.fetch_max(now, Ordering::SeqCst);

        if self.pause_initialize {
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
        }
        self.initializing.fetch_sub(1, Ordering::SeqCst);

        if self.fail_initialize {
            bail!("scripted initialize failure");
        }
        Ok(())
    }

    async fn evaluate(
        &self,
        ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Evaluation> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);

        if self.echo_wrong_message {
            let stranger = Message::from_participant(ctx.thread.id, "Stranger", "not the trigger");
            return Ok(Evaluation::ok(Some(&stranger)));
        }

        Ok(match (self.action, user_message) {
            (EvaluationAction::Ok, message) => Evaluation::ok(message),
            (EvaluationAction::Reject, Some(message)) => {
                Evaluation::reject(message, Some("Try again".to_string()))
            }
            (EvaluationAction::Reject, None) => Evaluation::ok(None),
            (EvaluationAction::Contribute, message) => {
                Evaluation::contribute(message, self.user_visible)
            }
        })
    }

    async fn respond(
        &self,
        ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Vec<AgentResponse>> {
        let reply = ctx
            .completion
            .complete(
                SCRIPTED_RESPOND_TEMPLATE,
                &variables([("transcript", ctx.transcript(user_message))]),
                ctx.agent_type.max_tokens,
            )
            .await?;
        Ok(vec![AgentResponse::visible(reply)])
    }

    fn is_within_limit(
        &self,
        agent_type: &AgentType,
        completion: &dyn BaseCompletionService,
        text: &str,
    ) -> bool {
        completion.within_limit(text, agent_type.max_tokens)
    }
}

/// Settings for a scripted agent type.
pub struct ScriptedType {
    pub id: &'static str,
    pub min_new_messages: Option<i32>,
    pub timer_period: Option<&'static str>,
    pub reacts_to_messages: bool,
    pub max_tokens: usize,
}

impl ScriptedType {
    pub fn reactive(id: &'static str) -> Self {
        Self {
            id,
            min_new_messages: None,
            timer_period: None,
            reacts_to_messages: true,
            max_tokens: 100,
        }
    }

    pub fn threshold(mut self, min_new_messages: i32) -> Self {
        self.min_new_messages = Some(min_new_messages);
        self
    }

    pub fn timer(mut self, period: &'static str) -> Self {
        self.timer_period = Some(period);
        self
    }

    pub fn timer_only(mut self) -> Self {
        self.reacts_to_messages = false;
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build the type around `behavior`.
    pub fn build(self, behavior: Arc<ScriptedBehavior>) -> AgentType {
        AgentType::builder()
            .id(self.id)
            .name(format!("Scripted {}", self.id))
            .description("Scripted agent type for tests")
            .max_tokens(self.max_tokens)
            .use_num_last_messages(5)
            .min_new_messages(self.min_new_messages)
            .timer_period(self.timer_period)
            .reacts_to_messages(self.reacts_to_messages)
            .behavior(behavior)
            .build()
    }
}
