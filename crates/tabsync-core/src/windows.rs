//! Per-window view of the sessions this client takes part in

use std::collections::HashMap;
use tabsync_session::Session;
use tabsync_tabs::{LocalTabId, SessionId, Tab, TabId, WindowId};

/// The session a window is bound to, as last seen by this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowBinding {
    pub session_id: SessionId,
    pub snapshot: Session,
}

#[derive(Debug, Default)]
pub struct WindowCache {
    windows: HashMap<WindowId, WindowBinding>,
    /// Window of every local tab that is mapped to a remote tab
    tab_windows: HashMap<LocalTabId, WindowId>,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `window` to `session`, replacing any earlier binding
    pub fn bind(&mut self, window: WindowId, session: Session) {
        tracing::debug!(window_id = window, session_id = session.id, "Bound window");
        self.windows.insert(
            window,
            WindowBinding {
                session_id: session.id,
                snapshot: session,
            },
        );
    }

    /// Drop the binding and forget the window's tabs. Returns those tabs.
    pub fn unbind(&mut self, window: WindowId) -> Vec<LocalTabId> {
        if self.windows.remove(&window).is_none() {
            return Vec::new();
        }
        let tabs = self.tabs_in(window);
        for local in &tabs {
            self.tab_windows.remove(local);
        }
        tracing::debug!(window_id = window, tabs = tabs.len(), "Unbound window");
        tabs
    }

    pub fn binding(&self, window: WindowId) -> Option<&WindowBinding> {
        self.windows.get(&window)
    }

    pub fn session_of(&self, window: WindowId) -> Option<SessionId> {
        self.windows.get(&window).map(|b| b.session_id)
    }

    pub fn windows_for_session(&self, session_id: SessionId) -> Vec<WindowId> {
        let mut windows: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, b)| b.session_id == session_id)
            .map(|(w, _)| *w)
            .collect();
        windows.sort_unstable();
        windows
    }

    pub fn track_tab(&mut self, local: LocalTabId, window: WindowId) {
        self.tab_windows.insert(local, window);
    }

    pub fn untrack_tab(&mut self, local: LocalTabId) -> Option<WindowId> {
        self.tab_windows.remove(&local)
    }

    pub fn window_of(&self, local: LocalTabId) -> Option<WindowId> {
        self.tab_windows.get(&local).copied()
    }

    pub fn tabs_in(&self, window: WindowId) -> Vec<LocalTabId> {
        let mut tabs: Vec<LocalTabId> = self
            .tab_windows
            .iter()
            .filter(|(_, w)| **w == window)
            .map(|(t, _)| *t)
            .collect();
        tabs.sort_unstable();
        tabs
    }

    /// Replace the snapshot of every window bound to `session.id`
    pub fn set_snapshot(&mut self, session: &Session) {
        for binding in self.bindings_mut(session.id) {
            binding.snapshot = session.clone();
        }
    }

    /// Insert or update a tab in the snapshots of its session
    pub fn upsert_tab(&mut self, tab: &Tab) {
        for binding in self.bindings_mut(tab.session_id) {
            match binding.snapshot.tab_mut(tab.id) {
                Some(existing) => existing.url = tab.url.clone(),
                None => binding.snapshot.tabs.push(tab.clone()),
            }
        }
    }

    pub fn remove_tab(&mut self, session_id: SessionId, tab_id: TabId) {
        for binding in self.bindings_mut(session_id) {
            binding.snapshot.remove_tab(tab_id);
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn bindings_mut(&mut self, session_id: SessionId) -> impl Iterator<Item = &mut WindowBinding> {
        self.windows
            .values_mut()
            .filter(move |b| b.session_id == session_id)
    }
}
