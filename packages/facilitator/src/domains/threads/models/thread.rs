use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::Message;
use crate::common::{MessageId, ThreadId};

/// A discussion thread together with its messages in creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub name: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    id: ThreadId,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ThreadId::new(),
            name: name.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Participant-authored messages only; agent contributions never count.
    pub fn human_message_count(&self) -> i32 {
        self.messages.iter().filter(|m| m.is_human()).count() as i32
    }

    pub fn contains_message(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    /// Append to the in-memory representation.
    pub fn push_message(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub async fn find_by_id(id: ThreadId, pool: &PgPool) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, ThreadRow>("SELECT * FROM threads WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let messages = Message::find_by_thread(row.id, pool).await?;
        Ok(Some(Self {
            id: row.id,
            name: row.name,
            messages,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Upsert the thread row. Messages are saved individually.
    pub async fn upsert(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO threads (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(self.created_at)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::agents::models::Pseudonym;

    #[test]
    fn human_count_skips_agent_messages() {
        let mut thread = Thread::new("Parks");
        thread.push_message(Message::from_participant(thread.id, "Heron", "Hi"));
        thread.push_message(Message::from_agent(
            thread.id,
            &Pseudonym::new("Facilitator"),
            "Welcome",
            true,
        ));
        thread.push_message(Message::from_participant(thread.id, "Otter", "Hello"));

        assert_eq!(thread.human_message_count(), 2);
    }
}
