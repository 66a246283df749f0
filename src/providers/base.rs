//! Base backend trait and common types for Chatgate
//!
//! This module defines the `ChatBackend` trait that all LLM providers
//! implement, the `Turn` message type shared with the session store, and the
//! tagged `Outcome` every generation resolves to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt turn (always index 0 of a session)
    System,
    /// End-user turn
    User,
    /// Model reply turn
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message unit in a session
///
/// Turns are immutable once appended; the session store only ever rewrites
/// the system turn's content in place when the configured prompt changes.
///
/// # Examples
///
/// ```
/// use chatgate::providers::{Role, Turn};
///
/// let turn = Turn::user("Hello!");
/// assert_eq!(turn.role, Role::User);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the message sender
    pub role: Role,
    /// Text content of the message
    pub content: String,
}

impl Turn {
    /// Creates a new system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a new user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reserved outcome kinds signalled by exact sentinel values
///
/// Sentinels are distinct from ordinary generated text and must travel
/// unmodified through every layer; the transport translates them to
/// user-facing copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    /// Web search plus the no-search fallback both produced nothing
    SearchNoData,
    /// The backend blocked the completion for sensitive content
    SensitiveContent,
}

impl Sentinel {
    /// Canonical wire string for this sentinel
    ///
    /// Callers classify by variant, never by string matching; the wire
    /// strings exist for logging and for exact-value propagation across a
    /// process boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchNoData => "[[SEARCH_NO_DATA_FOUND]]",
            Self::SensitiveContent => "[[SENSITIVE_CONTENT_BLOCKED]]",
        }
    }
}

/// Result of a generation call
///
/// Every path through the gateway terminates in one of these variants; the
/// gateway never surfaces a Rust error to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Ordinary non-empty generated reply
    Text(String),
    /// Reserved special outcome (no search data, sensitive content)
    Sentinel(Sentinel),
    /// Configuration or backend failure, already rendered as relay-able text
    ProviderError(String),
    /// The backend produced no content and no fallback applies
    Empty,
}

impl Outcome {
    /// Wraps backend text, mapping the empty string to [`Outcome::Empty`]
    pub fn from_content(content: String) -> Self {
        if content.is_empty() {
            Self::Empty
        } else {
            Self::Text(content)
        }
    }
}

/// A generation request as issued by the router
///
/// Unset fields resolve through the environment and per-provider fallbacks
/// inside the gateway; see [`LlmGateway::generate`](crate::providers::LlmGateway::generate).
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Full turn sequence snapshot (system turn first)
    pub turns: Vec<Turn>,
    /// Provider id override, case-insensitive
    pub provider: Option<String>,
    /// Model name override
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token limit override
    pub max_tokens: Option<u32>,
    /// Web search override; unset defaults to true only for zhipu
    pub web_search: Option<bool>,
}

impl GenerateRequest {
    /// Creates a request with default parameters for the given turns
    ///
    /// # Examples
    ///
    /// ```
    /// use chatgate::providers::{GenerateRequest, Turn};
    ///
    /// let req = GenerateRequest::new(vec![Turn::user("hi")]);
    /// assert_eq!(req.temperature, 0.7);
    /// assert!(req.provider.is_none());
    /// ```
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            provider: None,
            model: None,
            temperature: 0.7,
            max_tokens: None,
            web_search: None,
        }
    }

    /// Sets the provider id override
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the web search override
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = Some(enabled);
        self
    }
}

/// A request after parameter resolution, as handed to a backend
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    /// Full turn sequence snapshot
    pub turns: Vec<Turn>,
    /// Effective model name
    pub model: String,
    /// Effective sampling temperature
    pub temperature: f32,
    /// Effective completion token limit
    pub max_tokens: u32,
    /// Effective web search flag
    pub web_search: bool,
}

/// Backend trait for LLM providers
///
/// All providers (OpenAI-style, Claude-style, Zhipu-style) implement this
/// trait. A backend returns `Ok(Outcome)` for every call it could classify
/// itself, including its own failure text; an `Err` only escapes for
/// conditions the backend did not anticipate, and the gateway converts those
/// to a generic unavailability outcome.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Completes the given resolved request
    async fn chat(&self, request: &ResolvedRequest) -> Result<Outcome>;
}
