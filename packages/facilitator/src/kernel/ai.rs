// Completion service implementation using OpenAI
//
// This is the infrastructure implementation of BaseCompletionService.
// What to ask the model lives in the agent behaviors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use rig::providers::openai;

use super::prompt::{render_template, PromptVariables};
use super::BaseCompletionService;

const FACILITATOR_PREAMBLE: &str = "You are a thoughtful, neutral facilitator of an online group discussion.";

/// OpenAI implementation of the completion service
#[derive(Clone)]
pub struct OpenAiCompletionService {
    client: openai::Client,
    model: String,
}

impl OpenAiCompletionService {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: openai::Client::new(api_key),
            model: model.into(),
        }
    }
}

#[async_trait]
impl BaseCompletionService for OpenAiCompletionService {
    async fn complete(
        &self,
        template: &str,
        variables: &PromptVariables,
        max_tokens: usize,
    ) -> Result<String> {
        let prompt = render_template(template, variables)?;

        tracing::debug!(
            prompt_length = prompt.len(),
            model = %self.model,
            max_tokens,
            "Building OpenAI agent for completion"
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble(FACILITATOR_PREAMBLE)
            .max_tokens(max_tokens as u64)
            .build();

        let response = agent
            .prompt(prompt.as_str())
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    model = %self.model,
                    prompt_preview = %prompt.chars().take(200).collect::<String>(),
                    "OpenAI API call failed"
                );
                e
            })
            .context("Failed to call OpenAI API")?;

        tracing::info!(
            response_length = response.len(),
            model = %self.model,
            "OpenAI API response received"
        );

        Ok(response)
    }
}
