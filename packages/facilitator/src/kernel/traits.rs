// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no facilitation logic.
// Deciding when an agent speaks lives in domains/agents and uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseStore, BaseScheduler)

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompt::PromptVariables;
use crate::common::{AgentId, ThreadId};
use crate::domains::agents::models::Agent;
use crate::domains::threads::models::{Message, Thread};

// =============================================================================
// Completion Trait (Infrastructure - opaque text generation)
// =============================================================================

/// Rough characters-per-token ratio used for limit checks.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimated token count of `text`, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[async_trait]
pub trait BaseCompletionService: Send + Sync {
    /// Render `template` with `variables` and complete it with an LLM,
    /// generating at most `max_tokens`.
    async fn complete(
        &self,
        template: &str,
        variables: &PromptVariables,
        max_tokens: usize,
    ) -> Result<String>;

    /// Whether `text` fits in `limit` tokens.
    fn within_limit(&self, text: &str, limit: usize) -> bool {
        estimate_tokens(text) <= limit
    }
}

// =============================================================================
// Storage Trait (Infrastructure - agents, threads, messages)
// =============================================================================

#[async_trait]
pub trait BaseStore: Send + Sync {
    async fn find_agent(&self, id: AgentId) -> Result<Option<Agent>>;

    async fn list_agents(&self) -> Result<Vec<Agent>>;

    async fn list_agents_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Agent>>;

    /// Insert or update.
    async fn save_agent(&self, agent: &Agent) -> Result<()>;

    /// No-op if the agent does not exist.
    async fn delete_agent(&self, id: AgentId) -> Result<()>;

    /// Loads the thread with its messages in creation order.
    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>>;

    async fn save_thread(&self, thread: &Thread) -> Result<()>;

    async fn save_message(&self, message: &Message) -> Result<()>;
}

// =============================================================================
// Scheduler Trait (Infrastructure - named periodic jobs)
// =============================================================================

/// Payload carried by an agent's periodic job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPayload {
    pub agent_id: AgentId,
}

#[async_trait]
pub trait BaseScheduler: Send + Sync {
    /// Start firing jobs. Calling it again is a no-op.
    async fn start(&self) -> Result<()>;

    /// Register `job_name` to fire every `period`, replacing any job of that name.
    async fn every(&self, period: Duration, job_name: &str, payload: TimerPayload) -> Result<()>;

    /// Remove `job_name`. No-op if absent.
    async fn cancel(&self, job_name: &str) -> Result<()>;
}
