//! Core error types

use tabsync_tabs::{SessionId, WindowId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("RPC error: {0}")]
    Rpc(#[from] tabsync_rpc::RpcError),

    #[error("Session error: {0}")]
    Session(#[from] tabsync_session::SessionError),

    #[error("Tab error: {0}")]
    Tab(#[from] tabsync_tabs::TabError),

    #[error("Host error: {0}")]
    Host(#[from] crate::host::HostError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Window {0} is not bound to a session")]
    NotBound(WindowId),

    #[error("Window {0} is already bound to session {1}")]
    AlreadyBound(WindowId, SessionId),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
