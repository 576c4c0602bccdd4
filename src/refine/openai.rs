//! OpenAI completion oracle implementation.

use super::CompletionOracle;
use crate::error::{KlippError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::instrument;

/// OpenAI chat-completion oracle.
pub struct OpenAIOracle {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIOracle {
    /// Create a new oracle with default settings.
    pub fn new() -> Self {
        Self::with_config("gpt-4o-mini", 0.3)
    }

    /// Create a new oracle with custom model and temperature.
    pub fn with_config(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
        }
    }
}

impl Default for OpenAIOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionOracle for OpenAIOracle {
    #[instrument(skip(self, prompt))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content("You are an assistant that returns JSON only.")
                .build()
                .map_err(|e| KlippError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| KlippError::OpenAI(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| KlippError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| KlippError::OpenAI(format!("Completion API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| KlippError::OpenAI("Empty completion response".to_string()))
    }
}
