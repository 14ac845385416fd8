//! Agent types: registered behavior bundles shared by many agents.
//!
//! An `AgentType` pairs the declarative settings (window size, activation
//! threshold, timer period, token budget) with an `AgentBehavior`
//! implementation. The builder requires every field, so a type that forgets
//! to declare its threshold or timer does not compile; `None` is the explicit
//! way to say "unset".
//!
//! ```ignore
//! let agent_type = AgentType::builder()
//!     .id("discussion_facilitator")
//!     .name("Facilitator")
//!     .description("Keeps the conversation moving")
//!     .max_tokens(300)
//!     .use_num_last_messages(7)
//!     .min_new_messages(Some(2))
//!     .timer_period(Some("3 minutes"))
//!     .reacts_to_messages(true)
//!     .behavior(Arc::new(DiscussionFacilitator))
//!     .build();
//! ```

mod civility;
mod facilitator;
mod reflector;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use typed_builder::TypedBuilder;

pub use civility::CivilityModerator;
pub use facilitator::DiscussionFacilitator;
pub use reflector::PeriodicReflector;

use super::error::AgentError;
use super::models::{Agent, AgentResponse, Evaluation};
use super::registry::AgentTypeRegistry;
use super::window::{conversation_window, transcript};
use crate::domains::threads::models::{Message, Thread};
use crate::kernel::BaseCompletionService;

/// Type-specific logic. Every operation is mandatory.
#[async_trait]
pub trait AgentBehavior: Send + Sync {
    /// Called once per process start, before any timer is registered.
    async fn initialize(&self, ctx: &AgentContext<'_>) -> Result<()>;

    /// Decide on an activation. `user_message` is `None` on periodic ticks.
    async fn evaluate(&self, ctx: &AgentContext<'_>, user_message: Option<&Message>)
        -> Result<Evaluation>;

    /// Generate the contribution for a CONTRIBUTE activation.
    async fn respond(
        &self,
        ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Vec<AgentResponse>>;

    /// Whether generated `text` may be posted.
    fn is_within_limit(
        &self,
        agent_type: &AgentType,
        completion: &dyn BaseCompletionService,
        text: &str,
    ) -> bool;
}

/// Immutable agent type definition.
#[derive(Clone, TypedBuilder)]
pub struct AgentType {
    pub id: &'static str,
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub description: String,
    /// Token budget for generated text
    pub max_tokens: usize,
    /// Window size for the conversation transcript
    pub use_num_last_messages: usize,
    /// New human messages required before a reactive activation; `None` = always eligible
    pub min_new_messages: Option<i32>,
    /// Human duration string, e.g. "5 minutes"; `None` = no periodic trigger
    pub timer_period: Option<&'static str>,
    /// Evaluated on every submitted message; `false` for timer-only types
    pub reacts_to_messages: bool,
    pub behavior: Arc<dyn AgentBehavior>,
}

impl fmt::Debug for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("max_tokens", &self.max_tokens)
            .field("use_num_last_messages", &self.use_num_last_messages)
            .field("min_new_messages", &self.min_new_messages)
            .field("timer_period", &self.timer_period)
            .field("reacts_to_messages", &self.reacts_to_messages)
            .finish_non_exhaustive()
    }
}

impl AgentType {
    /// Parsed timer period, if the type declares one.
    pub fn timer_duration(&self) -> Result<Option<Duration>, AgentError> {
        self.timer_period
            .map(|period| {
                parse_timer_period(period).map_err(|reason| AgentError::InvalidTimerPeriod {
                    agent_type: self.id.to_string(),
                    period: period.to_string(),
                    reason,
                })
            })
            .transpose()
    }
}

/// Parse "5 minutes", "90s", "1h 30m" and similar.
pub fn parse_timer_period(period: &str) -> Result<Duration, String> {
    let compact: String = period.split_whitespace().collect();
    let duration = humantime::parse_duration(&compact).map_err(|e| e.to_string())?;
    if duration.is_zero() {
        return Err("period must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Everything a behavior may look at during one activation.
pub struct AgentContext<'a> {
    pub agent: &'a Agent,
    pub agent_type: &'a AgentType,
    pub thread: &'a Thread,
    pub completion: &'a dyn BaseCompletionService,
    /// Human messages in the thread, counting an in-flight message
    pub human_message_count: i32,
}

impl<'a> AgentContext<'a> {
    pub fn new(
        agent: &'a Agent,
        agent_type: &'a AgentType,
        thread: &'a Thread,
        completion: &'a dyn BaseCompletionService,
        human_message_count: i32,
    ) -> Self {
        Self {
            agent,
            agent_type,
            thread,
            completion,
            human_message_count,
        }
    }

    /// Human messages since this agent last activated.
    pub fn new_human_messages(&self) -> i32 {
        self.human_message_count - self.agent.last_active_message_count
    }

    /// Recent messages rendered as "speaker: body" lines.
    pub fn window(&self, in_flight: Option<&Message>) -> Vec<String> {
        conversation_window(
            &self.thread.messages,
            self.agent_type.use_num_last_messages,
            in_flight,
        )
    }

    pub fn transcript(&self, in_flight: Option<&Message>) -> String {
        transcript(&self.window(in_flight))
    }
}

/// Registry holding every built-in agent type.
pub fn builtin_registry() -> Result<AgentTypeRegistry, AgentError> {
    let mut registry = AgentTypeRegistry::new();
    registry.register(civility::agent_type())?;
    registry.register(facilitator::agent_type())?;
    registry.register(reflector::agent_type())?;
    Ok(registry)
}
