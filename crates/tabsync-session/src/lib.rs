//! Tabsync Session Management
//!
//! - A Session is a coordinator-owned, ordered group of tabs
//! - Any number of client connections may be members of one session
//! - Every mutation reports the notifications other members must receive
//! - Sessions are in-memory only and do not survive a coordinator restart

mod error;
mod merge;
mod notify;
mod session;
mod store;

pub use error::SessionError;
pub use merge::{MergePolicy, MergeReport};
pub use notify::{Notification, Outcome, Update};
pub use session::{Session, SessionType};
pub use store::{ClientId, SessionStore, StoreOptions};

pub type Result<T> = std::result::Result<T, SessionError>;
