//! Command-line interface definition for Chatgate
//!
//! This module defines the CLI structure using clap's derive API. The
//! binary ships a single local chat loop; transports integrate through the
//! library instead.

use clap::Parser;

/// Chatgate - LLM chat gateway with rolling per-user history
///
/// Routes inbound messages to a configured LLM provider, keeping a
/// durable rolling conversation history per session.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "chatgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Override the session database directory
    #[arg(short, long)]
    pub data_dir: Option<String>,

    /// Override the provider from config (openai, claude, zhipu)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
