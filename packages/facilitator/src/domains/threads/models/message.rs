use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{MessageId, PseudonymId, ThreadId};
use crate::domains::agents::models::Pseudonym;

/// Message - one contribution to a discussion thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub body: String,
    /// Display name of the author at the time of posting
    pub pseudonym: String,
    pub pseudonym_id: Option<PseudonymId>,
    /// Authored by a facilitation agent rather than a participant
    pub from_agent: bool,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A participant message that has not been persisted yet.
    pub fn from_participant(
        thread_id: ThreadId,
        pseudonym: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            thread_id,
            body: body.into(),
            pseudonym: pseudonym.into(),
            pseudonym_id: None,
            from_agent: false,
            visible: true,
            created_at: Utc::now(),
        }
    }

    /// An agent contribution posted under the agent's pseudonym.
    pub fn from_agent(
        thread_id: ThreadId,
        pseudonym: &Pseudonym,
        body: impl Into<String>,
        visible: bool,
    ) -> Self {
        Self {
            id: MessageId::new(),
            thread_id,
            body: body.into(),
            pseudonym: pseudonym.name.clone(),
            pseudonym_id: Some(pseudonym.id),
            from_agent: true,
            visible,
            created_at: Utc::now(),
        }
    }

    pub fn is_human(&self) -> bool {
        !self.from_agent
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub async fn find_by_thread(thread_id: ThreadId, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM messages WHERE thread_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(thread_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn upsert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, thread_id, body, pseudonym, pseudonym_id, from_agent, visible, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET body = EXCLUDED.body, visible = EXCLUDED.visible
            "#,
        )
        .bind(self.id)
        .bind(self.thread_id)
        .bind(&self.body)
        .bind(&self.pseudonym)
        .bind(self.pseudonym_id)
        .bind(self.from_agent)
        .bind(self.visible)
        .bind(self.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
