//! Civility moderator: screens each submitted message before it is posted.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{AgentBehavior, AgentContext, AgentType};
use crate::domains::agents::models::{AgentResponse, Evaluation};
use crate::domains::threads::models::Message;
use crate::kernel::prompt::variables;
use crate::kernel::BaseCompletionService;

pub const ID: &str = "civility_moderator";

const DEFAULT_SUGGESTION: &str =
    "Please rephrase your message so it addresses ideas rather than people.";

const EVALUATE_TEMPLATE: &str = r#"You moderate an online discussion. Decide whether the newest message is uncivil: insulting, harassing, or attacking another participant rather than their ideas. Disagreement alone is not uncivil.

Recent conversation:
{transcript}

Newest message:
{message}

Respond with JSON only, in the form {{"uncivil": true|false, "suggestion": "<how the author could rephrase, or empty>"}}"#;

#[derive(Debug, Deserialize)]
struct Verdict {
    uncivil: bool,
    #[serde(default)]
    suggestion: Option<String>,
}

pub struct CivilityModerator;

pub(super) fn agent_type() -> AgentType {
    AgentType::builder()
        .id(ID)
        .name("Civility Moderator")
        .description("Asks participants to rephrase uncivil messages before they are posted")
        .max_tokens(200)
        .use_num_last_messages(5)
        .min_new_messages(None)
        .timer_period(None)
        .reacts_to_messages(true)
        .behavior(Arc::new(CivilityModerator))
        .build()
}

#[async_trait]
impl AgentBehavior for CivilityModerator {
    async fn initialize(&self, ctx: &AgentContext<'_>) -> Result<()> {
        debug!(agent_id = %ctx.agent.id, thread_id = %ctx.thread.id, "Civility moderator ready");
        Ok(())
    }

    async fn evaluate(
        &self,
        ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Evaluation> {
        // Nothing to screen on a periodic tick
        let Some(message) = user_message else {
            return Ok(Evaluation::ok(None));
        };

        let raw = ctx
            .completion
            .complete(
                EVALUATE_TEMPLATE,
                &variables([
                    ("transcript", ctx.transcript(None)),
                    ("message", message.body.clone()),
                ]),
                ctx.agent_type.max_tokens,
            )
            .await?;

        let verdict: Verdict = serde_json::from_str(extract_json(&raw))
            .with_context(|| format!("Unparseable civility verdict: {}", raw))?;

        if verdict.uncivil {
            let suggestion = verdict
                .suggestion
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SUGGESTION.to_string());
            return Ok(Evaluation::reject(message, Some(suggestion)));
        }

        Ok(Evaluation::ok(Some(message)))
    }

    async fn respond(
        &self,
        _ctx: &AgentContext<'_>,
        _user_message: Option<&Message>,
    ) -> Result<Vec<AgentResponse>> {
        // Never contributes
        Ok(Vec::new())
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

/// Strip markdown code fences the model sometimes wraps JSON in.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
