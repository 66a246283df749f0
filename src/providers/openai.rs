//! OpenAI chat-completions backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::Result;

use super::base::{ChatBackend, Outcome, ResolvedRequest, Turn};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Backend speaking the OpenAI `/chat/completions` wire format
pub struct OpenAiBackend {
    client: Client,
    config: BackendConfig,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(client: Client, config: BackendConfig) -> Self {
        Self { client, config }
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// Configured key, falling back to the environment; placeholder values
    /// from a checked-in template count as unset.
    fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty() && !k.starts_with("your_"))
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(&self, request: &ResolvedRequest) -> Result<Outcome> {
        let api_key = match self.api_key() {
            Some(key) => key,
            None => {
                tracing::warn!("OpenAI request rejected, no API key configured");
                return Ok(Outcome::ProviderError(
                    "OpenAI API key not configured".to_string(),
                ));
            }
        };

        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.turns,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.api_base());
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(Outcome::from_content(content))
    }
}
