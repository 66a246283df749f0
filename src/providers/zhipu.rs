//! Zhipu GLM backend with web search support
//!
//! Zhipu calls run a two-pass protocol when web search is enabled: the first
//! pass offers the `web_search` tool, and when the model goes down the tool
//! path without producing text, a second pass retries the same turns with no
//! tools attached. The second pass never recurses.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::Result;

use super::base::{ChatBackend, Outcome, ResolvedRequest, Sentinel, Turn};

const DEFAULT_API_BASE: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Error code Zhipu returns when the search tool pipeline itself fails;
/// treated as a cue to retry without tools rather than as a hard failure.
const SEARCH_PIPELINE_ERROR: &str = "1703";

const MIN_TEMPERATURE: f32 = 0.01;
const MAX_TEMPERATURE: f32 = 0.99;

/// Backend speaking the Zhipu GLM chat-completions wire format
pub struct ZhipuBackend {
    client: Client,
    config: BackendConfig,
}

/// What the first pass decided
enum FirstPass {
    /// Terminal answer, no second call needed
    Done(Outcome),
    /// Tool path produced no text, retry without tools
    Fallback,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    web_search: WebSearchTool,
}

#[derive(Debug, Serialize)]
struct WebSearchTool {
    enable: bool,
    search_engine: &'static str,
}

fn web_search_tools() -> Vec<Tool> {
    vec![Tool {
        tool_type: "web_search",
        web_search: WebSearchTool {
            enable: true,
            search_engine: "search_pro",
        },
    }]
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl ZhipuBackend {
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
            .or_else(|| std::env::var("ZHIPUAI_API_KEY").ok())
            .filter(|k| !k.is_empty() && !k.starts_with("your_"))
    }

    async fn call(
        &self,
        api_key: &str,
        request: &ResolvedRequest,
        tools: Option<Vec<Tool>>,
    ) -> Result<std::result::Result<ChatResponse, ApiError>> {
        let body = ChatRequest {
            model: &request.model,
            messages: &request.turns,
            temperature: request.temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE),
            max_tokens: request.max_tokens,
            tools,
        };

        let url = format!("{}/chat/completions", self.api_base());
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(Ok(response.json().await?))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or_else(|_| ApiError {
                    code: status.as_u16().to_string(),
                    message: text,
                });
            Ok(Err(error))
        }
    }

    /// Classifies the first-pass response
    fn classify(response: ChatResponse, web_search: bool) -> FirstPass {
        let choice = match response.choices.into_iter().next() {
            Some(c) => c,
            None => {
                return FirstPass::Done(Outcome::ProviderError(
                    "unexpected response format".to_string(),
                ))
            }
        };

        let finish_reason = choice.finish_reason.as_deref().unwrap_or("");
        if finish_reason == "sensitive" {
            tracing::info!("Zhipu flagged the conversation as sensitive");
            return FirstPass::Done(Outcome::Sentinel(Sentinel::SensitiveContent));
        }

        let content = choice.message.content.unwrap_or_default();
        if !content.is_empty() {
            return FirstPass::Done(Outcome::Text(content));
        }

        let took_tool_path = choice.message.tool_calls.is_some()
            || finish_reason == "tool_calls"
            || web_search;
        if took_tool_path {
            FirstPass::Fallback
        } else {
            FirstPass::Done(Outcome::Empty)
        }
    }
}

#[async_trait]
impl ChatBackend for ZhipuBackend {
    async fn chat(&self, request: &ResolvedRequest) -> Result<Outcome> {
        let api_key = match self.api_key() {
            Some(key) => key,
            None => {
                tracing::warn!("Zhipu request rejected, no API key configured");
                return Ok(Outcome::ProviderError(
                    "ZhipuAI API key not configured".to_string(),
                ));
            }
        };

        let tools = if request.web_search {
            Some(web_search_tools())
        } else {
            None
        };

        let first_pass = match self.call(&api_key, request, tools).await? {
            Ok(response) => Self::classify(response, request.web_search),
            Err(error) if error.code == SEARCH_PIPELINE_ERROR => {
                tracing::warn!(
                    "Zhipu search pipeline error ({}), retrying without tools",
                    error.message
                );
                FirstPass::Fallback
            }
            Err(error) => {
                return Ok(Outcome::ProviderError(format!(
                    "Zhipu API error {}: {}",
                    error.code, error.message
                )));
            }
        };

        match first_pass {
            FirstPass::Done(outcome) => Ok(outcome),
            FirstPass::Fallback => {
                tracing::debug!("Zhipu first pass produced no text, retrying without tools");
                match self.call(&api_key, request, None).await? {
                    Ok(response) => {
                        let choice = response.choices.into_iter().next();
                        if choice
                            .as_ref()
                            .and_then(|c| c.finish_reason.as_deref())
                            == Some("sensitive")
                        {
                            return Ok(Outcome::Sentinel(Sentinel::SensitiveContent));
                        }
                        let content = choice
                            .and_then(|c| c.message.content)
                            .unwrap_or_default();
                        if content.is_empty() {
                            Ok(Outcome::Sentinel(Sentinel::SearchNoData))
                        } else {
                            Ok(Outcome::Text(content))
                        }
                    }
                    Err(error) => Ok(Outcome::ProviderError(format!(
                        "Zhipu API error {}: {}",
                        error.code, error.message
                    ))),
                }
            }
        }
    }
}
