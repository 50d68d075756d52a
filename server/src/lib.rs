//! Tabsync Server
//!
//! The coordinator: owns every session, accepts client connections over
//! WebSocket and relays each change to the other members of its session.

mod cli;
mod handler;
mod state;
mod ws;

pub use cli::{Cli, Commands, DebugCommands};
pub use handler::CoordinatorHandler;
pub use state::{push_request, ClientRecord, ServerState};
pub use ws::router;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tabsync_core::Config;
use tokio::net::TcpListener;

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging
    tabsync_core::init_logging();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    if let Some(Commands::Debug { url, command }) = cli.command {
        let url = url.unwrap_or_else(|| config.coordinator_url.clone());
        return cli::run_debug_client(&url, command, config.request_timeout()).await;
    }

    serve(config).await
}

/// Bind the configured address and run the coordinator until it fails
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        merge_policy = %config.merge_policy,
        reap_empty_sessions = config.reap_empty_sessions,
        "Tabsync coordinator listening"
    );

    serve_listener(listener, ServerState::new(config)).await
}

pub async fn serve_listener(listener: TcpListener, state: ServerState) -> anyhow::Result<()> {
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
