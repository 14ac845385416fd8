//! Discussion facilitator: after every couple of new messages, or when the
//! thread goes quiet, posts a short prompt to keep the conversation moving.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::{AgentBehavior, AgentContext, AgentType};
use crate::domains::agents::models::{AgentResponse, Evaluation};
use crate::domains::threads::models::Message;
use crate::kernel::prompt::variables;
use crate::kernel::BaseCompletionService;

pub const ID: &str = "discussion_facilitator";

const RESPOND_TEMPLATE: &str = r#"You are facilitating the discussion "{thread_name}".

Recent conversation:
{transcript}

Write one or two sentences that invite quieter participants in, connect points people have made, or ask an open question that moves the discussion forward. Do not take sides. Do not prefix your reply with a speaker name."#;

pub struct DiscussionFacilitator;

pub(super) fn agent_type() -> AgentType {
    AgentType::builder()
        .id(ID)
        .name("Discussion Facilitator")
        .description("Invites participation and asks open questions as the discussion develops")
        .max_tokens(300)
        .use_num_last_messages(7)
        .min_new_messages(Some(2))
        .timer_period(Some("3 minutes"))
        .reacts_to_messages(true)
        .behavior(Arc::new(DiscussionFacilitator))
        .build()
}

#[async_trait]
impl AgentBehavior for DiscussionFacilitator {
    async fn initialize(&self, ctx: &AgentContext<'_>) -> Result<()> {
        debug!(
            agent_id = %ctx.agent.id,
            thread_id = %ctx.thread.id,
            human_messages = ctx.human_message_count,
            "Discussion facilitator ready"
        );
        Ok(())
    }

    async fn evaluate(
        &self,
        _ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Evaluation> {
        // The runtime only lets eligible activations through
        Ok(Evaluation::contribute(user_message, true))
    }

    async fn respond(
        &self,
        ctx: &AgentContext<'_>,
        user_message: Option<&Message>,
    ) -> Result<Vec<AgentResponse>> {
        let reply = ctx
            .completion
            .complete(
                RESPOND_TEMPLATE,
                &variables([
                    ("thread_name", ctx.thread.name.clone()),
                    ("transcript", ctx.transcript(user_message)),
                ]),
                ctx.agent_type.max_tokens,
            )
            .await?;

        Ok(vec![AgentResponse::visible(reply.trim())])
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
