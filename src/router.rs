//! Message router
//!
//! Classifies inbound text as a command or an LLM prompt, drives the
//! session exchange under the per-session lock, and hands back a [`Reply`]
//! the transport layer can render.

use std::sync::Arc;

use crate::error::Result;
use crate::providers::base::{GenerateRequest, Outcome, Sentinel};
use crate::providers::LlmGateway;
use crate::session::SessionStore;

const SEARCH_NO_DATA_COPY: &str =
    "I searched the web but could not find anything relevant. Try rephrasing the question.";
const SENSITIVE_COPY: &str =
    "That topic was flagged by the content filter, so I can't answer it. Let's talk about something else.";

/// What the router produced for one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Text produced locally by a command handler
    Command(String),
    /// Result of a provider call
    Llm(Outcome),
}

impl Reply {
    /// Renders the reply for a transport
    ///
    /// Sentinels become fixed user-facing copy; an empty generation yields
    /// no message at all.
    pub fn render(self) -> Option<String> {
        match self {
            Reply::Command(text) => Some(text),
            Reply::Llm(Outcome::Text(text)) => Some(text),
            Reply::Llm(Outcome::Sentinel(Sentinel::SearchNoData)) => {
                Some(SEARCH_NO_DATA_COPY.to_string())
            }
            Reply::Llm(Outcome::Sentinel(Sentinel::SensitiveContent)) => {
                Some(SENSITIVE_COPY.to_string())
            }
            Reply::Llm(Outcome::ProviderError(detail)) => Some(detail),
            Reply::Llm(Outcome::Empty) => None,
        }
    }
}

/// Routes inbound messages to command handlers or the LLM gateway
pub struct Router {
    store: Arc<SessionStore>,
    gateway: Arc<LlmGateway>,
}

impl Router {
    pub fn new(store: Arc<SessionStore>, gateway: Arc<LlmGateway>) -> Self {
        Self { store, gateway }
    }

    /// Handles one inbound message for a session
    ///
    /// Returns `Ok(None)` only for blank input. An empty generation still
    /// comes back as `Some(Reply::Llm(Outcome::Empty))` and drops to no
    /// message at render time.
    pub async fn process(&self, session_id: &str, text: &str) -> Result<Option<Reply>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        match text.to_lowercase().as_str() {
            "clear session" => {
                let existed = self.store.clear(session_id).await?;
                let ack = if existed {
                    "Conversation history cleared."
                } else {
                    "No history found; started a fresh session."
                };
                tracing::info!(session_id, existed, "Handled clear command");
                return Ok(Some(Reply::Command(ack.to_string())));
            }
            "help" => {
                return Ok(Some(Reply::Command(self.help_text())));
            }
            _ => {}
        }

        let session = self.store.session(session_id);
        let mut session = session.lock().await;

        session.refresh_system_prompt(self.store.system_prompt());
        session.push_user(text);
        session.trim(self.store.max_history());

        let request = GenerateRequest::new(session.turns().to_vec());
        let outcome = self.gateway.generate(request).await;

        if let Outcome::Text(reply) = &outcome {
            session.push_assistant(reply.clone());
            session.trim(self.store.max_history());
            // A failed mirror write costs durability, not the reply.
            if let Err(e) = self.store.persist_turns(session_id, session.turns()) {
                tracing::error!(session_id, "Failed to persist session: {:#}", e);
            }
        }

        Ok(Some(Reply::Llm(outcome)))
    }

    fn help_text(&self) -> String {
        let prompt = self.store.system_prompt();
        let excerpt: String = prompt.chars().take(80).collect();
        let ellipsis = if prompt.chars().count() > 80 { "…" } else { "" };
        format!(
            "Commands:\n  clear session — forget this conversation\n  help — show this message\n\nPersona: {}{}\nHistory window: last {} turns",
            excerpt,
            ellipsis,
            self.store.max_history()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use tempfile::TempDir;

    fn router(dir: &TempDir) -> Router {
        let store = Arc::new(SessionStore::new(dir.path(), "test prompt", 4).unwrap());
        let gateway = Arc::new(LlmGateway::new(&ProviderConfig::default()));
        Router::new(store, gateway)
    }

    #[tokio::test]
    async fn test_blank_input_gets_no_reply() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        assert_eq!(router.process("u1", "   ").await.unwrap(), None);
        assert_eq!(router.process("u1", "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_command_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        let reply = router.process("u1", "  CLEAR Session ").await.unwrap();
        assert_eq!(
            reply,
            Some(Reply::Command(
                "No history found; started a fresh session.".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_help_lists_commands_and_window() {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        let reply = router.process("u1", "HELP").await.unwrap();
        let text = match reply {
            Some(Reply::Command(text)) => text,
            other => panic!("unexpected reply: {:?}", other),
        };
        assert!(text.contains("clear session"));
        assert!(text.contains("test prompt"));
        assert!(text.contains("last 4 turns"));
    }

    #[test]
    fn test_render_sentinels_and_empty() {
        assert_eq!(
            Reply::Llm(Outcome::Sentinel(Sentinel::SearchNoData)).render(),
            Some(SEARCH_NO_DATA_COPY.to_string())
        );
        assert_eq!(
            Reply::Llm(Outcome::Sentinel(Sentinel::SensitiveContent)).render(),
            Some(SENSITIVE_COPY.to_string())
        );
        assert_eq!(Reply::Llm(Outcome::Empty).render(), None);
        assert_eq!(
            Reply::Llm(Outcome::Text("hi".to_string())).render(),
            Some("hi".to_string())
        );
        assert_eq!(
            Reply::Command("ok".to_string()).render(),
            Some("ok".to_string())
        );
    }
}
