//! Coordinator state shared by every connection

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tabsync_core::Config;
use tabsync_rpc::{
    CloseTabRequest, NavigationRequest, OpenTabRequest, RequestBody, Rpc, SendStateRequest,
    Transport,
};
use tabsync_session::{ClientId, Notification, Outcome, SessionStore, Update};
use tabsync_tabs::SessionId;

use crate::handler::CoordinatorHandler;

/// One accepted connection
pub struct ClientRecord {
    pub rpc: Arc<Rpc>,
    pub connected_at: DateTime<Utc>,
    pub remote_addr: Option<SocketAddr>,
}

/// Thread-safe coordinator state.
///
/// Lock order is store, then clients. Store mutations and the fan-out of
/// their notifications happen under the store lock so every member sees
/// updates in one global order.
#[derive(Clone)]
pub struct ServerState {
    store: Arc<Mutex<SessionStore>>,
    clients: Arc<RwLock<HashMap<ClientId, ClientRecord>>>,
    last_client_id: Arc<AtomicU64>,
    config: Arc<Config>,
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(Mutex::new(SessionStore::new(config.store_options()))),
            clients: Arc::new(RwLock::new(HashMap::new())),
            last_client_id: Arc::new(AtomicU64::new(0)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accept a connection: assign its client ID and build its channel
    pub fn open_channel(
        &self,
        transport: Arc<dyn Transport>,
        remote_addr: Option<SocketAddr>,
    ) -> (ClientId, Arc<Rpc>) {
        let client_id = self.last_client_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handler = CoordinatorHandler::new(client_id, self.clone());
        let rpc = Arc::new(
            Rpc::new(format!("client-{}", client_id), transport, Arc::new(handler))
                .with_request_timeout(self.config.request_timeout()),
        );

        self.clients.write().insert(
            client_id,
            ClientRecord {
                rpc: rpc.clone(),
                connected_at: Utc::now(),
                remote_addr,
            },
        );
        tracing::info!(client_id, remote_addr = ?remote_addr, "Client connected");

        (client_id, rpc)
    }

    /// Forget a closed connection and drop all of its memberships
    pub fn close_channel(&self, client_id: ClientId) -> Vec<SessionId> {
        let record = self.clients.write().remove(&client_id);
        let left = self.store.lock().disconnect_client(client_id);

        if let Some(record) = record {
            let duration = Utc::now().signed_duration_since(record.connected_at);
            tracing::info!(
                client_id,
                remote_addr = ?record.remote_addr,
                connected_secs = duration.num_seconds(),
                sessions = left.len(),
                "Client disconnected"
            );
        }
        left
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Read-only or notification-free access to the store
    pub fn with_store<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut SessionStore) -> T,
    {
        f(&mut self.store.lock())
    }

    /// Run a store mutation and push its notifications to their targets
    pub fn apply<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut SessionStore) -> Result<Outcome<T>, E>,
    {
        let mut store = self.store.lock();
        let outcome = f(&mut store)?;
        self.dispatch(outcome.notifications);
        Ok(outcome.value)
    }

    fn dispatch(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        let clients = self.clients.read();
        for notification in notifications {
            let Some(record) = clients.get(&notification.target) else {
                tracing::debug!(client_id = notification.target, "Notification target already gone");
                continue;
            };
            let body = push_request(notification.update);
            let kind = body.kind();
            if let Err(err) = record.rpc.notify(body) {
                tracing::warn!(client_id = notification.target, kind, error = %err, "Failed to push update");
            }
        }
    }
}

/// The fire-and-forget request that carries an update to a member
pub fn push_request(update: Update) -> RequestBody {
    match update {
        Update::StateChanged(session) => RequestBody::SendStateRequest(SendStateRequest { session }),
        Update::TabOpened(tab) => RequestBody::OpenTabRequest(OpenTabRequest {
            session_id: tab.session_id,
            url: tab.url,
            tab_id: Some(tab.id),
        }),
        Update::TabClosed { session_id, tab_id } => {
            RequestBody::CloseTabRequest(CloseTabRequest { session_id, tab_id })
        }
        Update::TabNavigated(tab) => RequestBody::NavigationRequest(NavigationRequest {
            url: tab.url,
            session_id: Some(tab.session_id),
            tab_id: Some(tab.id),
        }),
    }
}
