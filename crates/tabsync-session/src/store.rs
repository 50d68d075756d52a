//! Session Store
//!
//! The coordinator's single source of truth: every session, its member
//! connections and its tabs. The store is a plain value; callers serialize
//! access to it (the coordinator keeps it behind one mutex) and dispatch the
//! returned notifications themselves.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tabsync_tabs::{SessionId, Tab, TabId};

use crate::error::SessionError;
use crate::merge::{merge_into, MergePolicy};
use crate::notify::{Notification, Outcome, Update};
use crate::session::{Session, SessionType};
use crate::Result;

/// Coordinator-assigned connection identifier
pub type ClientId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub merge_policy: MergePolicy,
    /// Delete a session once its last member disconnects
    pub reap_empty_sessions: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::Union,
            reap_empty_sessions: true,
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    members: BTreeSet<ClientId>,
    /// Tabs closed in this session; merges must not bring them back
    closed_tabs: HashSet<TabId>,
}

impl SessionEntry {
    fn notify_others(&self, origin: ClientId, update: Update) -> Vec<Notification> {
        self.members
            .iter()
            .filter(|&&member| member != origin)
            .map(|&target| Notification {
                target,
                update: update.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    /// Keyed by ID, so iteration order is creation order
    sessions: BTreeMap<SessionId, SessionEntry>,
    /// Last allocated session ID
    last_session_id: SessionId,
    /// Last allocated tab ID
    last_tab_id: TabId,
    options: StoreOptions,
}

impl SessionStore {
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Create a new session with `client` as its only member
    pub fn create_session(&mut self, client: ClientId, session_type: SessionType) -> Session {
        self.last_session_id += 1;
        let session = Session::new(self.last_session_id, session_type);

        self.sessions.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                members: BTreeSet::from([client]),
                closed_tabs: HashSet::new(),
            },
        );

        tracing::info!(session_id = session.id, client_id = client, "Created session");

        session
    }

    /// Snapshot of all live sessions, in creation order
    pub fn list_sessions(&self) -> Vec<Session> {
        self.sessions.values().map(|e| e.session.clone()).collect()
    }

    pub fn session(&self, session_id: SessionId) -> Result<Session> {
        Ok(self.entry(session_id)?.session.clone())
    }

    pub fn members(&self, session_id: SessionId) -> Result<Vec<ClientId>> {
        Ok(self.entry(session_id)?.members.iter().copied().collect())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add `client` to a session and return its current state
    pub fn connect_to_session(&mut self, client: ClientId, session_id: SessionId) -> Result<Session> {
        let entry = self.entry_mut(session_id)?;
        entry.members.insert(client);

        tracing::info!(
            session_id,
            client_id = client,
            members = entry.members.len(),
            tab_count = entry.session.tab_count(),
            "Client connected to session"
        );

        Ok(entry.session.clone())
    }

    /// Remove `client` from a session. Returns true if the session was deleted.
    pub fn disconnect_from_session(&mut self, client: ClientId, session_id: SessionId) -> Result<bool> {
        let entry = self.entry_mut(session_id)?;
        entry.members.remove(&client);
        let empty = entry.members.is_empty();

        tracing::info!(session_id, client_id = client, "Client disconnected from session");

        if empty && self.options.reap_empty_sessions {
            self.sessions.remove(&session_id);
            tracing::info!(session_id, "Deleted session without members");
            return Ok(true);
        }

        Ok(false)
    }

    /// Drop every membership held by `client`. Used when its connection closes.
    pub fn disconnect_client(&mut self, client: ClientId) -> Vec<SessionId> {
        let joined: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, e)| e.members.contains(&client))
            .map(|(&id, _)| id)
            .collect();

        for &session_id in &joined {
            if let Err(e) = self.disconnect_from_session(client, session_id) {
                tracing::warn!(session_id, client_id = client, "Cleanup failed: {}", e);
            }
        }

        joined
    }

    /// Reconcile a client-pushed snapshot with the stored session
    pub fn merge_session(&mut self, client: ClientId, incoming: Session) -> Result<Outcome<Session>> {
        let policy = self.options.merge_policy;
        let last_tab_id = &mut self.last_tab_id;
        let entry = self
            .sessions
            .get_mut(&incoming.id)
            .ok_or(SessionError::NotFound(incoming.id))?;

        let report = merge_into(
            &mut entry.session,
            incoming,
            policy,
            &entry.closed_tabs,
            || {
                *last_tab_id += 1;
                *last_tab_id
            },
        );

        for tab_id in &report.removed {
            entry.closed_tabs.insert(*tab_id);
        }

        tracing::debug!(
            session_id = entry.session.id,
            client_id = client,
            %policy,
            added = report.added.len(),
            updated = report.updated.len(),
            removed = report.removed.len(),
            dropped = report.dropped,
            "Merged session state"
        );

        let merged = entry.session.clone();
        let notifications = if report.is_empty() {
            Vec::new()
        } else {
            entry.notify_others(client, Update::StateChanged(merged.clone()))
        };

        Ok(Outcome::new(merged, notifications))
    }

    /// Open a new tab at the end of a session
    pub fn open_tab(&mut self, client: ClientId, session_id: SessionId, url: String) -> Result<Outcome<Tab>> {
        // Validate before allocating so a bad URL doesn't burn an ID
        let mut tab = Tab::new(0, session_id, url)?;
        let entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;

        self.last_tab_id += 1;
        tab.id = self.last_tab_id;
        entry.session.add_tab(tab.clone());

        tracing::info!(session_id, tab_id = tab.id, url = %tab.url, "Opened tab");

        let notifications = entry.notify_others(client, Update::TabOpened(tab.clone()));
        Ok(Outcome::new(tab, notifications))
    }

    /// Close the tab with remote ID `tab_id`
    pub fn close_tab(&mut self, client: ClientId, session_id: SessionId, tab_id: TabId) -> Result<Outcome<Tab>> {
        let entry = self.entry_mut(session_id)?;
        let tab = entry
            .session
            .remove_tab(tab_id)
            .ok_or(SessionError::TabNotFound { session_id, tab_id })?;
        entry.closed_tabs.insert(tab_id);

        tracing::info!(session_id, tab_id, "Closed tab");

        let notifications = entry.notify_others(client, Update::TabClosed { session_id, tab_id });
        Ok(Outcome::new(tab, notifications))
    }

    /// Record a completed navigation of a tab
    pub fn navigate_tab(
        &mut self,
        client: ClientId,
        session_id: SessionId,
        tab_id: TabId,
        url: String,
    ) -> Result<Outcome<Tab>> {
        let entry = self.entry_mut(session_id)?;
        let tab = entry
            .session
            .tab_mut(tab_id)
            .ok_or(SessionError::TabNotFound { session_id, tab_id })?;
        tab.navigate(url)?;
        let tab = tab.clone();

        let notifications = entry.notify_others(client, Update::TabNavigated(tab.clone()));
        Ok(Outcome::new(tab, notifications))
    }

    fn entry(&self, session_id: SessionId) -> Result<&SessionEntry> {
        self.sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))
    }

    fn entry_mut(&mut self, session_id: SessionId) -> Result<&mut SessionEntry> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))
    }
}
