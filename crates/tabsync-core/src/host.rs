//! The browser the client runs inside

use tabsync_tabs::{LocalTabId, WindowId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("No such window: {0}")]
    NoSuchWindow(WindowId),

    #[error("No such tab: {0}")]
    NoSuchTab(LocalTabId),

    #[error("{0}")]
    Other(String),
}

/// Tab operations the client needs from its browser.
///
/// Calls are synchronous and are never made while client state is locked,
/// so an implementation may deliver events back into the `Client` from
/// inside them.
pub trait TabHost: Send + Sync {
    /// Local tabs of a window in strip order, with their current URLs
    fn window_tabs(&self, window: WindowId) -> Result<Vec<(LocalTabId, String)>, HostError>;

    fn open_tab(&self, window: WindowId, url: &str) -> Result<LocalTabId, HostError>;

    fn close_tab(&self, tab: LocalTabId) -> Result<(), HostError>;

    fn navigate_tab(&self, tab: LocalTabId, url: &str) -> Result<(), HostError>;
}
