//! Command line interface

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabsync_core::{Config, HostError, TabHost};
use tabsync_tabs::{LocalTabId, WindowId};
use tokio::sync::oneshot;

#[derive(Parser, Debug)]
#[command(name = "tabsync-server")]
#[command(about = "Tabsync session coordinator and debug client")]
pub struct Cli {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Fail unanswered requests after this many milliseconds (0 waits forever)
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Talk to a running coordinator as a throwaway client
    Debug {
        /// Coordinator URL (e.g., ws://127.0.0.1:8787/ws)
        #[arg(short, long)]
        url: Option<String>,

        #[command(subcommand)]
        command: DebugCommands,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommands {
    /// Print every live session
    ListSessions,
    /// Create an empty session, print it and stay connected until Ctrl-C.
    /// The coordinator deletes the session once this client leaves.
    CreateSession,
}

impl Cli {
    /// Defaults, then the config file, then the environment, then flags
    pub fn load_config(&self) -> Result<Config> {
        self.load_config_with(|key| std::env::var(key).ok())
    }

    fn load_config_with(&self, var: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        config.apply_vars(var)?;

        if let Some(host) = &self.host {
            config.listen_host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(timeout) = self.request_timeout_ms {
            config.request_timeout_ms = timeout;
        }
        Ok(config)
    }
}

/// The debug client owns no browser tabs
struct NoTabs;

impl TabHost for NoTabs {
    fn window_tabs(&self, _: WindowId) -> std::result::Result<Vec<(LocalTabId, String)>, HostError> {
        Ok(Vec::new())
    }

    fn open_tab(&self, _: WindowId, _: &str) -> std::result::Result<LocalTabId, HostError> {
        Err(HostError::Other("debug client cannot open tabs".to_string()))
    }

    fn close_tab(&self, _: LocalTabId) -> std::result::Result<(), HostError> {
        Ok(())
    }

    fn navigate_tab(&self, _: LocalTabId, _: &str) -> std::result::Result<(), HostError> {
        Ok(())
    }
}

pub async fn run_debug_client(
    url: &str,
    command: DebugCommands,
    request_timeout: Option<Duration>,
) -> Result<()> {
    run_debug_command(url, command, request_timeout, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to listen for Ctrl-C");
        }
    })
    .await
}

/// Run one debug command. A created session is held until `stop` resolves.
async fn run_debug_command(
    url: &str,
    command: DebugCommands,
    request_timeout: Option<Duration>,
    stop: impl Future<Output = ()>,
) -> Result<()> {
    tracing::debug!(url, ?command, "Running debug command");
    let mut connection = tokio::time::timeout(
        Duration::from_secs(5),
        tabsync_core::connect(url, Arc::new(NoTabs), request_timeout),
    )
    .await
    .with_context(|| format!("Timed out connecting to {}", url))??;

    let output = match command {
        DebugCommands::ListSessions => {
            let (tx, rx) = oneshot::channel();
            connection.client().list_sessions(move |result| {
                let _ = tx.send(result);
            })?;
            let sessions = rx.await.context("Connection closed")??;
            serde_json::to_string_pretty(&sessions)?
        }
        DebugCommands::CreateSession => {
            let session = connection.client().create_session(0).await?;
            serde_json::to_string_pretty(&session)?
        }
    };
    println!("{}", output);

    if command == DebugCommands::CreateSession {
        tracing::info!("Holding the session open, press Ctrl-C to leave");
        tokio::select! {
            _ = stop => {}
            result = connection.closed() => {
                result.context("Coordinator connection lost")?;
                return Ok(());
            }
        }
    }

    connection.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ServerState;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_debug_command() {
        let cli = Cli::parse_from([
            "tabsync-server",
            "debug",
            "--url",
            "ws://127.0.0.1:1/ws",
            "list-sessions",
        ]);
        match cli.command {
            Some(Commands::Debug { url, command }) => {
                assert_eq!(url.as_deref(), Some("ws://127.0.0.1:1/ws"));
                assert_eq!(command, DebugCommands::ListSessions);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["tabsync-server", "--port", "9100", "--request-timeout-ms", "0"]);
        let config = cli.load_config_with(|_| None).unwrap();
        assert_eq!(config.listen_port, 9100);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.listen_host, "127.0.0.1");
    }

    #[test]
    fn test_flags_beat_environment() {
        let cli = Cli::parse_from(["tabsync-server", "--port", "9100"]);
        let config = cli
            .load_config_with(|key| match key {
                "TABSYNC_PORT" => Some("9200".to_string()),
                "TABSYNC_HOST" => Some("0.0.0.0".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.listen_port, 9100);
        assert_eq!(config.listen_host, "0.0.0.0");
    }

    async fn wait_for_sessions(state: &ServerState, count: usize) {
        for _ in 0..200 {
            if state.with_store(|s| s.len()) == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} sessions", count);
    }

    #[tokio::test]
    async fn test_created_session_is_held_until_stopped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        let state = ServerState::new(Config::default());
        tokio::spawn(crate::serve_listener(listener, state.clone()));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let debug = tokio::spawn(async move {
            run_debug_command(&url, DebugCommands::CreateSession, None, async {
                let _ = stop_rx.await;
            })
            .await
        });

        wait_for_sessions(&state, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.with_store(|s| s.len()), 1);

        stop_tx.send(()).unwrap();
        debug.await.unwrap().unwrap();
        wait_for_sessions(&state, 0).await;
    }
}
