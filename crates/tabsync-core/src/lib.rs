//! Tabsync Core
//!
//! Client-side coordination for one browser instance, plus the
//! configuration and logging shared by every Tabsync binary.
//! The coordinator owns the sessions. A client only caches them per window.

mod client;
mod config;
mod connection;
mod error;
mod handler;
mod host;
mod windows;

pub use client::{Client, ClientState};
pub use config::Config;
pub use connection::{connect, Connection};
pub use error::CoreError;
pub use handler::ClientHandler;
pub use host::{HostError, TabHost};
pub use windows::{WindowBinding, WindowCache};

// Re-export the protocol and model crates
pub use tabsync_rpc::{RequestBody, Response, ResponseBody, Rpc, RpcError};
pub use tabsync_session::{MergePolicy, Session, SessionError, SessionType, StoreOptions};
pub use tabsync_tabs::{LocalTabId, SessionId, Tab, TabError, TabId, TabIdMap, WindowId};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
