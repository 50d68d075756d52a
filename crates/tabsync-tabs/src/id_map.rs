//! Bidirectional mapping between local (browser) tab IDs and remote
//! (coordinator) tab IDs.
//!
//! One remote tab may be mirrored by several local tabs, e.g. when the same
//! session is open in two windows of one browser. A local tab maps to at most
//! one remote tab.

use std::collections::{HashMap, HashSet};

use crate::tab::{LocalTabId, TabId};

#[derive(Debug, Default, Clone)]
pub struct TabIdMap {
    local_to_remote: HashMap<LocalTabId, TabId>,
    /// Never holds an empty set
    remote_to_locals: HashMap<TabId, HashSet<LocalTabId>>,
}

impl TabIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a mapping. A local ID already mapped elsewhere is moved.
    pub fn add(&mut self, local: LocalTabId, remote: TabId) {
        if let Some(previous) = self.local_to_remote.insert(local, remote) {
            if previous != remote {
                self.detach_reverse(local, previous);
            }
        }
        self.remote_to_locals.entry(remote).or_default().insert(local);
    }

    pub fn get_remote(&self, local: LocalTabId) -> Option<TabId> {
        self.local_to_remote.get(&local).copied()
    }

    /// All local IDs mirroring `remote`, or `None` when there are none.
    pub fn get_locals(&self, remote: TabId) -> Option<&HashSet<LocalTabId>> {
        self.remote_to_locals.get(&remote)
    }

    /// Deletes the `(local, remote)` pair. Missing halves are ignored.
    pub fn remove(&mut self, local: LocalTabId, remote: TabId) {
        if self.local_to_remote.get(&local) == Some(&remote) {
            self.local_to_remote.remove(&local);
        }
        self.detach_reverse(local, remote);
    }

    /// Deletes whatever mapping `local` has, returning the remote ID it pointed at.
    pub fn remove_local(&mut self, local: LocalTabId) -> Option<TabId> {
        let remote = self.local_to_remote.remove(&local)?;
        self.detach_reverse(local, remote);
        Some(remote)
    }

    /// Number of mapped local tabs
    pub fn len(&self) -> usize {
        self.local_to_remote.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local_to_remote.is_empty()
    }

    fn detach_reverse(&mut self, local: LocalTabId, remote: TabId) {
        if let Some(locals) = self.remote_to_locals.get_mut(&remote) {
            locals.remove(&local);
            if locals.is_empty() {
                self.remote_to_locals.remove(&remote);
            }
        }
    }
}
