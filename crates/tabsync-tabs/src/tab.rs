//! Tab data structure
//!
//! Only the coordinator-facing identity lives here. Local tab IDs are aliases
//! owned by a single client and never stored on a `Tab`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TabError;
use crate::Result;

/// Globally unique tab identifier assigned by the coordinator.
pub type TabId = u64;

/// Session identifier assigned by the coordinator.
pub type SessionId = u64;

/// Tab identifier assigned by the host browser. Only meaningful inside one client.
pub type LocalTabId = i64;

/// Browser window identifier. Only meaningful inside one client.
pub type WindowId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Remote identifier
    pub id: TabId,
    /// Current URL, empty until the first navigation completes
    #[serde(default)]
    pub url: String,
    /// Session this tab belongs to
    pub session_id: SessionId,
}

impl Tab {
    pub fn new(id: TabId, session_id: SessionId, url: String) -> Result<Self> {
        validate_url(&url)?;

        Ok(Self { id, url, session_id })
    }

    /// Update URL (navigation)
    pub fn navigate(&mut self, url: String) -> Result<()> {
        if url.is_empty() {
            return Err(TabError::InvalidUrl("URL cannot be empty".to_string()));
        }
        validate_url(&url)?;

        tracing::debug!(tab_id = self.id, from = %self.url, to = %url, "Tab navigated");
        self.url = url;

        Ok(())
    }

    /// True until the tab has navigated somewhere
    pub fn is_blank(&self) -> bool {
        self.url.is_empty()
    }
}

/// Empty URLs are allowed for freshly opened tabs; anything else must parse.
fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Ok(());
    }
    Url::parse(url).map_err(|e| TabError::InvalidUrl(format!("{url}: {e}")))?;
    Ok(())
}
