//! Session error types

use tabsync_tabs::{SessionId, TabId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Tab {tab_id} not found in session {session_id}")]
    TabNotFound { session_id: SessionId, tab_id: TabId },

    #[error("Tab error: {0}")]
    Tab(#[from] tabsync_tabs::TabError),
}

impl SessionError {
    /// True for the "unknown ID" family of failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::TabNotFound { .. })
    }
}
