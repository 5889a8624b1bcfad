//! Chatline - terminal chat client
//!
//! Keeps the visible conversation consistent with an asynchronous assistant
//! backend: optimistic sends with rollback, serialized requests, and a
//! typewriter reveal of each reply.

mod backend;
mod cli;
mod config;
mod conversations;
mod messages;
mod refresh;
mod reveal;
mod session;
mod state_machine;

use backend::{HttpBackend, LoggingBackend};
use config::ClientConfig;
use session::ChatSession;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatline=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(
        api_base = %config.api_base,
        reveal_tick = ?config.reveal_tick,
        timeout_secs = config.request_timeout.as_secs(),
        "Starting chat client"
    );

    let backend = Arc::new(LoggingBackend::new(HttpBackend::new(&config)?));
    let mut session = ChatSession::new(backend, config.reveal_tick);

    cli::run(&mut session).await?;

    Ok(())
}
