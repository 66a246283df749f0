//! Anthropic messages backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::Result;

use super::base::{ChatBackend, Outcome, ResolvedRequest, Role};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Backend speaking the Anthropic `/messages` wire format
///
/// System turns are not legal in the `messages` array; they are lifted into
/// the top-level `system` field, joined with newlines when there is more
/// than one.
pub struct ClaudeBackend {
    client: Client,
    config: BackendConfig,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

impl ClaudeBackend {
    pub fn new(client: Client, config: BackendConfig) -> Self {
        Self { client, config }
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.is_empty() && !k.starts_with("your_"))
    }
}

#[async_trait]
impl ChatBackend for ClaudeBackend {
    async fn chat(&self, request: &ResolvedRequest) -> Result<Outcome> {
        let api_key = match self.api_key() {
            Some(key) => key,
            None => {
                tracing::warn!("Claude request rejected, no API key configured");
                return Ok(Outcome::ProviderError(
                    "Claude API key not configured".to_string(),
                ));
            }
        };

        let system_parts: Vec<&str> = request
            .turns
            .iter()
            .filter(|t| t.role == Role::System)
            .map(|t| t.content.as_str())
            .collect();
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n"))
        };

        let messages: Vec<WireMessage> = request
            .turns
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| WireMessage {
                role: match t.role {
                    Role::Assistant => "assistant",
                    _ => "user",
                },
                content: &t.content,
            })
            .collect();

        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system,
            messages,
        };

        let url = format!("{}/messages", self.api_base());
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text);

        match text {
            Some(content) => Ok(Outcome::from_content(content)),
            None => Ok(Outcome::ProviderError(
                "unexpected response format".to_string(),
            )),
        }
    }
}
