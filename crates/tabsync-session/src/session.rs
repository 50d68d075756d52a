//! Session data structure

use serde::{Deserialize, Serialize};
use tabsync_tabs::{SessionId, Tab, TabId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    /// All tabs of one browser window
    #[default]
    Window,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Coordinator-assigned identifier
    pub id: SessionId,
    #[serde(default)]
    pub session_type: SessionType,
    /// Ordered list of tabs
    #[serde(default)]
    pub tabs: Vec<Tab>,
}

impl Session {
    pub fn new(id: SessionId, session_type: SessionType) -> Self {
        Self {
            id,
            session_type,
            tabs: Vec::new(),
        }
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    pub fn tab_mut(&mut self, tab_id: TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == tab_id)
    }

    pub fn contains_tab(&self, tab_id: TabId) -> bool {
        self.tab(tab_id).is_some()
    }

    /// Append a tab unless one with the same ID is already present
    pub fn add_tab(&mut self, tab: Tab) {
        if !self.contains_tab(tab.id) {
            self.tabs.push(tab);
        }
    }

    /// Remove a tab, returning it if it was present
    pub fn remove_tab(&mut self, tab_id: TabId) -> Option<Tab> {
        let index = self.tabs.iter().position(|t| t.id == tab_id)?;
        Some(self.tabs.remove(index))
    }

    /// Move a tab to a new position
    pub fn move_tab(&mut self, tab_id: TabId, new_index: usize) {
        if let Some(current_index) = self.tabs.iter().position(|t| t.id == tab_id) {
            let tab = self.tabs.remove(current_index);
            let insert_index = new_index.min(self.tabs.len());
            self.tabs.insert(insert_index, tab);
        }
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }
}
