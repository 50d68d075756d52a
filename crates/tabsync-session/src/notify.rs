//! Side effects produced by store mutations.
//!
//! The store never performs I/O. Each mutation returns the value the caller
//! asked for together with the updates that have to reach other members.

use tabsync_tabs::{SessionId, Tab, TabId};

use crate::session::Session;
use crate::store::ClientId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// The whole session changed (after a merge)
    StateChanged(Session),
    TabOpened(Tab),
    TabClosed { session_id: SessionId, tab_id: TabId },
    TabNavigated(Tab),
}

/// An update addressed to one member connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub target: ClientId,
    pub update: Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub notifications: Vec<Notification>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, notifications: Vec<Notification>) -> Self {
        Self {
            value,
            notifications,
        }
    }

    pub fn targets(&self) -> Vec<ClientId> {
        self.notifications.iter().map(|n| n.target).collect()
    }
}
