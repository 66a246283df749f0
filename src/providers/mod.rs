//! Provider module for Chatgate
//!
//! This module contains the LLM backend abstraction, the three backend
//! implementations (OpenAI-style, Claude-style, Zhipu-style), and the
//! `LlmGateway` that resolves effective parameters and dispatches calls.

pub mod base;
pub mod claude;
pub mod openai;
pub mod zhipu;

pub use base::{
    ChatBackend, GenerateRequest, Outcome, ResolvedRequest, Role, Sentinel, Turn,
};
pub use claude::ClaudeBackend;
pub use openai::OpenAiBackend;
pub use zhipu::ZhipuBackend;

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Client;

use crate::config::ProviderConfig;

/// Fallback completion token limit shared by all providers
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default model per provider when neither argument nor environment sets one
const DEFAULT_ZHIPU_MODEL: &str = "glm-4-flash";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_CLAUDE_MODEL: &str = "claude-3-sonnet-20240229";

/// Closed set of supported provider ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    /// OpenAI chat-completions style backend
    OpenAi,
    /// Anthropic messages style backend
    Claude,
    /// Zhipu GLM backend with web search support
    Zhipu,
}

impl ProviderId {
    /// Lowercase id used in configuration and request overrides
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Claude => "claude",
            Self::Zhipu => "zhipu",
        }
    }

    /// Human-readable provider name for error copy
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Claude => "Claude",
            Self::Zhipu => "ZhipuAI",
        }
    }

    fn model_env_var(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_MODEL",
            Self::Claude => "CLAUDE_MODEL",
            Self::Zhipu => "GLM_MODEL",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
            Self::Claude => DEFAULT_CLAUDE_MODEL,
            Self::Zhipu => DEFAULT_ZHIPU_MODEL,
        }
    }

    fn max_tokens_env_var(&self) -> String {
        format!("{}_MAX_TOKENS", self.as_str().to_uppercase())
    }
}

impl FromStr for ProviderId {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "claude" => Ok(Self::Claude),
            "zhipu" => Ok(Self::Zhipu),
            _ => Err(()),
        }
    }
}

/// Unified gateway in front of the configured backends
///
/// The gateway owns a registry of backends built once at startup, resolves
/// unset request parameters (argument, then environment, then hardcoded
/// fallback), and guarantees that every call terminates in an [`Outcome`].
/// It never propagates an error to its caller.
pub struct LlmGateway {
    backends: HashMap<ProviderId, Box<dyn ChatBackend>>,
    default_provider: String,
    /// Construction failure detail, surfaced when a call hits the empty registry
    client_error: Option<String>,
}

impl LlmGateway {
    /// Build the gateway registry from provider configuration
    ///
    /// A backend whose HTTP client cannot be constructed is left out of the
    /// registry with a warning; calls naming it later resolve to a
    /// "client unavailable" outcome rather than failing startup.
    pub fn new(config: &ProviderConfig) -> Self {
        let mut backends: HashMap<ProviderId, Box<dyn ChatBackend>> = HashMap::new();
        let mut client_error = None;

        match build_client() {
            Ok(client) => {
                backends.insert(
                    ProviderId::OpenAi,
                    Box::new(OpenAiBackend::new(client.clone(), config.openai.clone())),
                );
                backends.insert(
                    ProviderId::Claude,
                    Box::new(ClaudeBackend::new(client.clone(), config.claude.clone())),
                );
                backends.insert(
                    ProviderId::Zhipu,
                    Box::new(ZhipuBackend::new(client, config.zhipu.clone())),
                );
            }
            Err(e) => {
                tracing::warn!("Failed to build HTTP client, no backends registered: {}", e);
                client_error = Some(e.to_string());
            }
        }

        Self {
            backends,
            default_provider: config.default_provider.clone(),
            client_error,
        }
    }

    /// Generate a reply for the given request
    ///
    /// Resolution order for unset parameters: explicit argument, then the
    /// provider's environment override, then the hardcoded fallback. The
    /// environment is read at call time so overrides apply without a
    /// restart.
    pub async fn generate(&self, request: GenerateRequest) -> Outcome {
        let provider_raw = request
            .provider
            .clone()
            .or_else(|| std::env::var("LLM_PROVIDER").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| self.default_provider.clone())
            .to_lowercase();

        let provider = match ProviderId::from_str(&provider_raw) {
            Ok(p) => p,
            Err(()) => {
                tracing::warn!("Rejected request for unknown provider '{}'", provider_raw);
                return Outcome::ProviderError(format!(
                    "unsupported provider: {}",
                    provider_raw
                ));
            }
        };

        let resolved = ResolvedRequest {
            turns: request.turns,
            model: resolve_model(provider, request.model),
            temperature: request.temperature,
            max_tokens: resolve_max_tokens(provider, request.max_tokens),
            // Web search defaults on only for the search-capable provider.
            web_search: request
                .web_search
                .unwrap_or(provider == ProviderId::Zhipu),
        };

        tracing::debug!(
            provider = provider.as_str(),
            model = %resolved.model,
            max_tokens = resolved.max_tokens,
            web_search = resolved.web_search,
            turns = resolved.turns.len(),
            "Dispatching generation request"
        );

        let backend = match self.backends.get(&provider) {
            Some(b) => b,
            None => {
                let detail = self
                    .client_error
                    .as_deref()
                    .unwrap_or("backend not registered");
                return Outcome::ProviderError(format!(
                    "{} client unavailable: {}",
                    provider.display_name(),
                    detail
                ));
            }
        };

        match backend.chat(&resolved).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    provider = provider.as_str(),
                    model = %resolved.model,
                    "Generation failed: {:#}",
                    e
                );
                Outcome::ProviderError(format!(
                    "AI service ({}) temporarily unavailable: {}",
                    provider.as_str(),
                    e
                ))
            }
        }
    }
}

fn build_client() -> crate::error::Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("chatgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(Into::into)
}

fn resolve_model(provider: ProviderId, explicit: Option<String>) -> String {
    if let Some(model) = explicit {
        return model;
    }
    std::env::var(provider.model_env_var())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| provider.default_model().to_string())
}

fn resolve_max_tokens(provider: ProviderId, explicit: Option<u32>) -> u32 {
    if let Some(value) = explicit {
        return value;
    }
    let raw = std::env::var(provider.max_tokens_env_var())
        .or_else(|_| std::env::var("LLM_MAX_TOKENS"))
        .ok()
        .filter(|v| !v.is_empty());
    match raw {
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid MAX_TOKENS value '{}', falling back to {}",
                s,
                DEFAULT_MAX_TOKENS
            );
            DEFAULT_MAX_TOKENS
        }),
        None => DEFAULT_MAX_TOKENS,
    }
}
