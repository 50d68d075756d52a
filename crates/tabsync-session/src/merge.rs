//! Reconciliation of a client-pushed session snapshot with the stored one.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tabsync_tabs::{Tab, TabId};

use crate::session::Session;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// The pushed snapshot replaces the stored tab list wholesale. Unknown
    /// tabs get fresh IDs and closed tabs stay closed.
    Overwrite,
    /// Union keyed by remote tab ID. Closed tabs stay closed, duplicate URLs are dropped.
    #[default]
    Union,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergePolicy::Overwrite => "overwrite",
            MergePolicy::Union => "union",
        }
    }
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(MergePolicy::Overwrite),
            "union" => Ok(MergePolicy::Union),
            _ => Err(format!("Unknown merge policy: {}", s)),
        }
    }
}

/// What a merge changed in the stored session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: Vec<TabId>,
    pub updated: Vec<TabId>,
    pub removed: Vec<TabId>,
    /// Incoming tabs that were discarded (closed, duplicate or malformed)
    pub dropped: usize,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Merge `incoming` into `stored`.
///
/// `closed` holds the IDs of tabs already closed in this session and
/// `allocate` hands out fresh remote tab IDs for tabs the store has not seen.
pub(crate) fn merge_into(
    stored: &mut Session,
    incoming: Session,
    policy: MergePolicy,
    closed: &HashSet<TabId>,
    allocate: impl FnMut() -> TabId,
) -> MergeReport {
    match policy {
        MergePolicy::Overwrite => overwrite(stored, incoming, closed, allocate),
        MergePolicy::Union => union(stored, incoming, closed, allocate),
    }
}

fn overwrite(
    stored: &mut Session,
    incoming: Session,
    closed: &HashSet<TabId>,
    mut allocate: impl FnMut() -> TabId,
) -> MergeReport {
    let mut report = MergeReport::default();
    let mut previous: HashSet<TabId> = stored.tabs.iter().map(|t| t.id).collect();

    let mut tabs = Vec::with_capacity(incoming.tabs.len());
    for tab in incoming.tabs {
        if closed.contains(&tab.id) {
            report.dropped += 1;
            continue;
        }
        match Tab::new(tab.id, stored.id, tab.url) {
            Ok(mut tab) => {
                // Each stored ID is claimed at most once; anything else is new
                if previous.remove(&tab.id) {
                    report.updated.push(tab.id);
                } else {
                    tab.id = allocate();
                    report.added.push(tab.id);
                }
                tabs.push(tab);
            }
            Err(_) => report.dropped += 1,
        }
    }

    let kept: HashSet<TabId> = tabs.iter().map(|t| t.id).collect();
    report.removed = stored
        .tabs
        .iter()
        .map(|t| t.id)
        .filter(|id| !kept.contains(id))
        .collect();
    stored.tabs = tabs;

    report
}

fn union(
    stored: &mut Session,
    incoming: Session,
    closed: &HashSet<TabId>,
    mut allocate: impl FnMut() -> TabId,
) -> MergeReport {
    let mut report = MergeReport::default();

    for tab in incoming.tabs {
        if let Some(existing) = stored.tab_mut(tab.id) {
            if !tab.url.is_empty() && tab.url != existing.url {
                if existing.navigate(tab.url).is_ok() {
                    report.updated.push(existing.id);
                } else {
                    report.dropped += 1;
                }
            }
            continue;
        }

        if closed.contains(&tab.id) {
            report.dropped += 1;
            continue;
        }

        if !tab.url.is_empty() && stored.tabs.iter().any(|t| t.url == tab.url) {
            report.dropped += 1;
            continue;
        }

        match Tab::new(0, stored.id, tab.url) {
            Ok(mut fresh) => {
                fresh.id = allocate();
                report.added.push(fresh.id);
                stored.tabs.push(fresh);
            }
            Err(_) => report.dropped += 1,
        }
    }

    report
}
