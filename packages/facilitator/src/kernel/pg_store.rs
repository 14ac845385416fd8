//! Postgres-backed `BaseStore`.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::BaseStore;
use crate::common::{AgentId, ThreadId};
use crate::domains::agents::models::Agent;
use crate::domains::threads::models::{Message, Thread};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseStore for PgStore {
    async fn find_agent(&self, id: AgentId) -> Result<Option<Agent>> {
        Agent::find_by_id(id, &self.pool).await
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        Agent::find_all(&self.pool).await
    }

    async fn list_agents_for_thread(&self, thread_id: ThreadId) -> Result<Vec<Agent>> {
        Agent::find_by_thread(thread_id, &self.pool).await
    }

    async fn save_agent(&self, agent: &Agent) -> Result<()> {
        agent.upsert(&self.pool).await
    }

    async fn delete_agent(&self, id: AgentId) -> Result<()> {
        Agent::delete(id, &self.pool).await
    }

    async fn find_thread(&self, id: ThreadId) -> Result<Option<Thread>> {
        Thread::find_by_id(id, &self.pool).await
    }

    async fn save_thread(&self, thread: &Thread) -> Result<()> {
        thread.upsert(&self.pool).await
    }

    async fn save_message(&self, message: &Message) -> Result<()> {
        message.upsert(&self.pool).await
    }
}
