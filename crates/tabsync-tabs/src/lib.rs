//! Tabsync Tab Model
//!
//! A tab has two identities:
//! - a remote ID, assigned by the coordinator and meaningful everywhere
//! - a local ID, assigned by one browser instance and meaningful only there
//!
//! `TabIdMap` is the per-client translation between the two.

mod error;
mod id_map;
mod tab;

pub use error::TabError;
pub use id_map::TabIdMap;
pub use tab::{LocalTabId, SessionId, Tab, TabId, WindowId};

pub type Result<T> = std::result::Result<T, TabError>;
