//! Chatgate - LLM chat gateway library
//!
//! This library provides the core functionality for running a chat gateway:
//! pluggable LLM backends, rolling per-session conversation history with a
//! durable mirror, and a router that turns inbound text into replies.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `providers`: backend abstraction and implementations (OpenAI, Claude, Zhipu)
//! - `session`: rolling conversation history and the sled-backed store
//! - `router`: command handling and the prompt exchange loop
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatgate::{Config, LlmGateway, Router, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     config.validate()?;
//!
//!     let store = Arc::new(SessionStore::new(
//!         &config.data_dir,
//!         &config.system_prompt,
//!         config.max_history_length,
//!     )?);
//!     store.load_all()?;
//!     let gateway = Arc::new(LlmGateway::new(&config.provider));
//!     let router = Router::new(store, gateway);
//!
//!     if let Some(reply) = router.process("user-1", "hello").await? {
//!         if let Some(text) = reply.render() {
//!             println!("{}", text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod router;
pub mod session;

pub use config::Config;
pub use error::{ChatgateError, Result};
pub use providers::{GenerateRequest, LlmGateway, Outcome, Sentinel, Turn};
pub use router::{Reply, Router};
pub use session::{Session, SessionStore};
