use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use std::time::Duration;

/// A text-generation service that turns a prompt into a conversational reply.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextOracle: Send + Sync {
    /// Makes a single generation call. Failures are returned as-is; callers
    /// are not expected to retry.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// An implementation of `TextOracle` for any OpenAI-compatible API.
pub struct OpenAICompatibleOracle {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAICompatibleOracle {
    /// Creates a new oracle client.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the provider.
    /// * `model` - The chat model to use (e.g., "gemini-1.5-flash").
    /// * `timeout` - Upper bound for one generation call.
    pub fn new(config: OpenAIConfig, model: String, timeout: Duration) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl TextOracle for OpenAICompatibleOracle {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| anyhow!("generation timed out after {:?}", self.timeout))??;

        let reply = response
            .choices
            .into_iter()
            .next()
            .context("No response choice from LLM")?
            .message
            .content
            .context("No content in LLM response")?;

        Ok(reply)
    }
}
