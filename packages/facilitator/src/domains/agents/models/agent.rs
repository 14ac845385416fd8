use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{AgentId, PseudonymId, ThreadId};
use crate::domains::agents::error::AgentError;
use crate::domains::agents::registry::AgentTypeRegistry;
use crate::domains::agents::types::AgentType;

/// Display identity an agent posts under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pseudonym {
    pub id: PseudonymId,
    pub name: String,
}

impl Pseudonym {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PseudonymId::new(),
            name: name.into(),
        }
    }
}

/// An automated facilitation participant bound to exactly one thread.
///
/// The agent type and pseudonym are fixed at provisioning. Name, description,
/// window size, threshold and timer period are read from the registry on
/// every access rather than copied onto the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    agent_type: String,
    pseudonym: Pseudonym,
    pub thread_id: ThreadId,
    /// Human message count at the last OK or CONTRIBUTE activation
    pub last_active_message_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: AgentId,
    agent_type: String,
    pseudonym_id: PseudonymId,
    pseudonym: String,
    thread_id: ThreadId,
    last_active_message_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AgentRow> for Agent {
    fn from(row: AgentRow) -> Self {
        Self {
            id: row.id,
            agent_type: row.agent_type,
            pseudonym: Pseudonym {
                id: row.pseudonym_id,
                name: row.pseudonym,
            },
            thread_id: row.thread_id,
            last_active_message_count: row.last_active_message_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Agent {
    /// Provision a new agent for `thread_id`, posting under the type's name.
    pub fn provision(agent_type: &AgentType, thread_id: ThreadId) -> Self {
        Self::with_pseudonym(agent_type, thread_id, Pseudonym::new(agent_type.name.clone()))
    }

    pub fn with_pseudonym(agent_type: &AgentType, thread_id: ThreadId, pseudonym: Pseudonym) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            agent_type: agent_type.id.to_string(),
            pseudonym,
            thread_id,
            last_active_message_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn agent_type_id(&self) -> &str {
        &self.agent_type
    }

    pub fn pseudonym(&self) -> &Pseudonym {
        &self.pseudonym
    }

    /// Scheduler job name for this agent's periodic timer.
    pub fn timer_job_name(&self) -> String {
        format!("agent-timer:{}", self.id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // =========================================================================
    // Fields sourced from the agent type
    // =========================================================================

    pub fn resolve_type<'r>(&self, registry: &'r AgentTypeRegistry) -> Result<&'r AgentType, AgentError> {
        registry.lookup(&self.agent_type)
    }

    pub fn name<'r>(&self, registry: &'r AgentTypeRegistry) -> Result<&'r str, AgentError> {
        Ok(self.resolve_type(registry)?.name.as_str())
    }

    pub fn description<'r>(&self, registry: &'r AgentTypeRegistry) -> Result<&'r str, AgentError> {
        Ok(self.resolve_type(registry)?.description.as_str())
    }

    pub fn use_num_last_messages(&self, registry: &AgentTypeRegistry) -> Result<usize, AgentError> {
        Ok(self.resolve_type(registry)?.use_num_last_messages)
    }

    pub fn min_new_messages(&self, registry: &AgentTypeRegistry) -> Result<Option<i32>, AgentError> {
        Ok(self.resolve_type(registry)?.min_new_messages)
    }

    pub fn timer_period<'r>(
        &self,
        registry: &'r AgentTypeRegistry,
    ) -> Result<Option<&'r str>, AgentError> {
        Ok(self.resolve_type(registry)?.timer_period)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub async fn find_by_id(id: AgentId, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, AgentRow>("SELECT * FROM agents WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, AgentRow>("SELECT * FROM agents ORDER BY created_at ASC")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_thread(thread_id: ThreadId, pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, AgentRow>(
            "SELECT * FROM agents WHERE thread_id = $1 ORDER BY created_at ASC",
        )
        .bind(thread_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Pseudonym and agent type are never overwritten once stored.
    pub async fn upsert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (id, agent_type, pseudonym_id, pseudonym, thread_id, last_active_message_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                last_active_message_count = EXCLUDED.last_active_message_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(self.id)
        .bind(&self.agent_type)
        .bind(self.pseudonym.id)
        .bind(&self.pseudonym.name)
        .bind(self.thread_id)
        .bind(self.last_active_message_count)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(id: AgentId, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
