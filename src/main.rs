//! Chatgate - LLM chat gateway
//!
//! Main entry point running the local stdin chat loop. Real transports
//! (IM bridges, HTTP frontends) embed the library instead.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatgate::cli::Cli;
use chatgate::config::Config;
use chatgate::providers::LlmGateway;
use chatgate::router::Router;
use chatgate::session::SessionStore;

/// Session id used by the local stdin driver
const LOCAL_SESSION: &str = "local";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Mirror the provider override into the environment so call-time
    // resolution picks it up the same way a deployed override would.
    if let Some(provider) = &cli.provider {
        std::env::set_var("LLM_PROVIDER", provider);
        tracing::info!("Using provider override from CLI: {}", provider);
    }

    let mut config = Config::load(&cli.config)?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.into();
    }
    config.validate()?;

    let store = Arc::new(SessionStore::new(
        &config.data_dir,
        &config.system_prompt,
        config.max_history_length,
    )?);
    store.load_all()?;

    let gateway = Arc::new(LlmGateway::new(&config.provider));
    let router = Router::new(store, gateway);

    tracing::info!("Chatgate ready, type 'help' for commands, Ctrl-D to exit");
    run_chat_loop(&router).await
}

/// Reads lines from stdin and prints rendered replies until EOF
async fn run_chat_loop(router: &Router) -> Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match router.process(LOCAL_SESSION, &line).await {
            Ok(Some(reply)) => {
                if let Some(text) = reply.render() {
                    println!("{}", text);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Failed to handle message: {:#}", e),
        }
        prompt()?;
    }
    println!();
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "chatgate=debug" } else { "chatgate=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
