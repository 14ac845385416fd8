//! Periodic reflector: on its timer, summarizes what was said since it last
//! spoke. Ignores individual messages.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{AgentBehavior, AgentContext, AgentType};
use crate::domains::agents::models::{AgentResponse, Evaluation};
use crate::domains::threads::models::Message;
use crate::kernel::prompt::variables;
use crate::kernel::BaseCompletionService;

pub const ID: &str = "periodic_reflector";

const RESPOND_TEMPLATE: &str = r#"Here is the latest part of the discussion "{thread_name}":

{transcript}

In at most three sentences, reflect back the main points and any open disagreements so participants can see where the conversation stands. Stay neutral. Do not prefix your reply with a speaker name."#;

pub struct PeriodicReflector;

pub(super) fn agent_type() -> AgentType {
    AgentType::builder()
        .id(ID)
        .name("Discussion Reflector")
        .description("Periodically summarizes recent discussion")
        .max_tokens(400)
        .use_num_last_messages(10)
        .min_new_messages(None)
        .timer_period(Some("5 minutes"))
        .reacts_to_messages(false)
        .behavior(Arc::new(PeriodicReflector))
        .build()
}

#[async_trait]
impl AgentBehavior for PeriodicReflector {
    async fn initialize(&self, ctx: &AgentContext<'_>) -> Result<()> {
        debug!(agent_id = %ctx.agent.id, thread_id = %ctx.thread.id, "Reflector ready");
        Ok(())
    }

    async fn evaluate(
        &self,
        ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Evaluation> {
        if user_message.is_some() || ctx.new_human_messages() <= 0 {
            return Ok(Evaluation::ok(user_message));
        }
        Ok(Evaluation::contribute(None, true))
    }

    async fn respond(
        &self,
        ctx: &AgentContext<'_>,
        _user_message: Option<&Message>,
    ) -> Result<Vec<AgentResponse>> {
        let summary = ctx
            .completion
            .complete(
                RESPOND_TEMPLATE,
                &variables([
                    ("thread_name", ctx.thread.name.clone()),
                    ("transcript", ctx.transcript(None)),
                ]),
                ctx.agent_type.max_tokens,
            )
            .await?;

        Ok(vec![AgentResponse::visible(summary.trim())])
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
