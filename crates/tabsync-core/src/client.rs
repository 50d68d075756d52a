//! One browser instance talking to the coordinator
//!
//! The `Client` turns user commands and host tab events into requests, and
//! keeps the window cache and the local/remote tab ID map in step with the
//! responses. Host calls are made with the state lock released.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tabsync_rpc::{
    CloseTabRequest, ConnectToSessionRequest, CreateSessionRequest, DisconnectFromSessionRequest,
    ListSessionsRequest, NavigationRequest, OpenTabRequest, RequestBody, Response, ResponseBody,
    Rpc, RpcError, SendStateRequest, Transport,
};
use tabsync_session::{Session, SessionType};
use tabsync_tabs::{LocalTabId, SessionId, Tab, TabId, TabIdMap, WindowId};

use crate::error::CoreError;
use crate::handler::ClientHandler;
use crate::host::TabHost;
use crate::windows::WindowCache;
use crate::Result;

#[derive(Debug, Default)]
pub struct ClientState {
    pub cache: WindowCache,
    pub ids: TabIdMap,
}

impl ClientState {
    /// Record that `local` in `window` is the remote `tab`
    pub(crate) fn adopt(&mut self, window: WindowId, local: LocalTabId, tab: &Tab) {
        self.ids.add(local, tab.id);
        self.cache.track_tab(local, window);
        self.cache.upsert_tab(tab);
    }

    /// Unmap every local alias of `remote`, returning them
    pub(crate) fn forget_remote(&mut self, remote: TabId) -> Vec<LocalTabId> {
        let locals: Vec<LocalTabId> = self
            .ids
            .get_locals(remote)
            .map(|locals| locals.iter().copied().collect())
            .unwrap_or_default();
        for local in &locals {
            self.ids.remove(*local, remote);
            self.cache.untrack_tab(*local);
        }
        locals
    }
}

#[derive(Clone)]
pub struct Client {
    rpc: Arc<Rpc>,
    state: Arc<Mutex<ClientState>>,
    host: Arc<dyn TabHost>,
}

impl Client {
    pub fn new(
        transport: Arc<dyn Transport>,
        host: Arc<dyn TabHost>,
        request_timeout: Option<Duration>,
    ) -> Self {
        let state = Arc::new(Mutex::new(ClientState::default()));
        let handler = ClientHandler::new(state.clone(), host.clone());
        let rpc = Rpc::new("client", transport, Arc::new(handler))
            .with_request_timeout(request_timeout);

        Self {
            rpc: Arc::new(rpc),
            state,
            host,
        }
    }

    /// The channel to feed inbound frames into, usually through `drive`
    pub fn rpc(&self) -> &Arc<Rpc> {
        &self.rpc
    }

    pub fn state(&self) -> &Arc<Mutex<ClientState>> {
        &self.state
    }

    pub fn session_of(&self, window: WindowId) -> Option<SessionId> {
        self.state.lock().cache.session_of(window)
    }

    pub fn snapshot(&self, window: WindowId) -> Option<Session> {
        self.state
            .lock()
            .cache
            .binding(window)
            .map(|b| b.snapshot.clone())
    }

    pub fn remote_id(&self, local: LocalTabId) -> Option<TabId> {
        self.state.lock().ids.get_remote(local)
    }

    // User commands

    pub fn list_sessions<F>(&self, on_sessions: F) -> Result<()>
    where
        F: FnOnce(Result<Vec<Session>>) + Send + 'static,
    {
        self.rpc.request(
            RequestBody::ListSessionsRequest(ListSessionsRequest {}),
            move |result| {
                on_sessions(result.map_err(CoreError::from).and_then(|response| {
                    match response.body {
                        ResponseBody::ListSessionsResponse(body) => Ok(body.sessions),
                        other => Err(unexpected("listSessionsResponse", &other)),
                    }
                }))
            },
        )?;
        Ok(())
    }

    /// Create a session and bind `window` to it. The window's existing tabs
    /// become the session's first tabs.
    pub async fn create_session(&self, window: WindowId) -> Result<Session> {
        self.ensure_unbound(window)?;
        let response = self
            .rpc
            .call(RequestBody::CreateSessionRequest(CreateSessionRequest {
                session_type: SessionType::Window,
            }))
            .await?;
        let session = match response.body {
            ResponseBody::CreateSessionResponse(body) => body.session,
            other => return Err(unexpected("createSessionResponse", &other)),
        };

        tracing::info!(window_id = window, session_id = session.id, "Created session");
        self.state.lock().cache.bind(window, session.clone());
        self.register_unmapped(window, session.id).await?;

        Ok(self.snapshot(window).unwrap_or(session))
    }

    /// Join an existing session from `window`. Remote tabs are mirrored
    /// into the window and its unshared tabs are added to the session.
    pub async fn connect_to_session(&self, window: WindowId, session_id: SessionId) -> Result<Session> {
        self.ensure_unbound(window)?;
        let response = self
            .rpc
            .call(RequestBody::ConnectToSessionRequest(ConnectToSessionRequest {
                id: session_id,
            }))
            .await?;
        let session = match response.body {
            ResponseBody::ConnectToSessionResponse(body) => body.session,
            other => return Err(unexpected("connectToSessionResponse", &other)),
        };

        tracing::info!(window_id = window, session_id, tabs = session.tabs.len(), "Connected to session");
        self.state.lock().cache.bind(window, session.clone());
        reconcile_window(&self.state, self.host.as_ref(), window, &session)?;
        self.register_unmapped(window, session_id).await?;

        Ok(self.snapshot(window).unwrap_or(session))
    }

    /// Leave the session bound to `window`. Local tabs stay open.
    ///
    /// Membership is per connection, so the coordinator is only told once
    /// no other window of this client is bound to the session.
    pub async fn disconnect_from_session(&self, window: WindowId) -> Result<()> {
        let (session_id, shared) = {
            let state = self.state.lock();
            let session_id = state
                .cache
                .session_of(window)
                .ok_or(CoreError::NotBound(window))?;
            (session_id, state.cache.windows_for_session(session_id).len() > 1)
        };

        if !shared {
            let response = self
                .rpc
                .call(RequestBody::DisconnectFromSessionRequest(
                    DisconnectFromSessionRequest { id: session_id },
                ))
                .await?;
            if !matches!(response.body, ResponseBody::DisconnectFromSessionResponse(_)) {
                return Err(unexpected("disconnectFromSessionResponse", &response.body));
            }
        }

        let mut state = self.state.lock();
        for local in state.cache.unbind(window) {
            state.ids.remove_local(local);
        }
        tracing::info!(window_id = window, session_id, "Disconnected from session");
        Ok(())
    }

    /// Push the window's tabs as the session state and adopt the merged
    /// result the coordinator answers with.
    pub async fn push_state(&self, window: WindowId) -> Result<Session> {
        let local_tabs = self.host.window_tabs(window)?;
        let pushed = {
            let state = self.state.lock();
            let session_id = state
                .cache
                .session_of(window)
                .ok_or(CoreError::NotBound(window))?;

            let mut session = Session::new(session_id, SessionType::Window);
            for (local, url) in local_tabs {
                let id = state.ids.get_remote(local).unwrap_or(0);
                match Tab::new(id, session_id, url) {
                    Ok(tab) => session.tabs.push(tab),
                    Err(err) => tracing::warn!(local_tab_id = local, error = %err, "Not pushing tab"),
                }
            }
            session
        };

        let response = self
            .rpc
            .call(RequestBody::SendStateRequest(SendStateRequest {
                session: pushed.clone(),
            }))
            .await?;
        let merged = match response.body {
            ResponseBody::SendStateResponse(body) => body.session.unwrap_or(pushed),
            other => return Err(unexpected("sendStateResponse", &other)),
        };

        reconcile_window(&self.state, self.host.as_ref(), window, &merged)?;
        Ok(merged)
    }

    /// A window takes part in at most one session. Switching means
    /// disconnecting first, so the old session's tabs stay open and unmapped.
    fn ensure_unbound(&self, window: WindowId) -> Result<()> {
        match self.state.lock().cache.session_of(window) {
            Some(session_id) => Err(CoreError::AlreadyBound(window, session_id)),
            None => Ok(()),
        }
    }

    async fn register_unmapped(&self, window: WindowId, session_id: SessionId) -> Result<()> {
        let local_tabs = self.host.window_tabs(window)?;
        let unmapped: Vec<(LocalTabId, String)> = {
            let state = self.state.lock();
            local_tabs
                .into_iter()
                .filter(|(local, _)| state.ids.get_remote(*local).is_none())
                .collect()
        };

        for (local, url) in unmapped {
            let response = self
                .rpc
                .call(open_tab_request(session_id, url))
                .await?;
            let tab = match response.body {
                ResponseBody::OpenTabResponse(body) => body.tab,
                other => return Err(unexpected("openTabResponse", &other)),
            };
            self.state.lock().adopt(window, local, &tab);
        }
        Ok(())
    }

    // Host events

    /// A tab was opened in `window`. Tabs the client opened itself are
    /// already mapped and ignored.
    pub fn on_tab_created(&self, window: WindowId, local: LocalTabId, url: &str) -> Result<()> {
        let session_id = {
            let state = self.state.lock();
            if state.ids.get_remote(local).is_some() {
                return Ok(());
            }
            match state.cache.session_of(window) {
                Some(session_id) => session_id,
                None => return Ok(()),
            }
        };

        let state = self.state.clone();
        let host = self.host.clone();
        self.rpc
            .request(open_tab_request(session_id, url.to_string()), move |result| {
                match result {
                    Ok(Response {
                        body: ResponseBody::OpenTabResponse(body),
                        ..
                    }) => {
                        tracing::debug!(local_tab_id = local, tab_id = body.tab.id, "Registered tab");
                        state.lock().adopt(window, local, &body.tab);
                        // The coordinator does not echo to us, so our other
                        // windows on this session are updated here
                        mirror_tab(&state, host.as_ref(), &body.tab);
                    }
                    Ok(response) => {
                        tracing::warn!(kind = response.body.kind(), "Unexpected reply to openTabRequest")
                    }
                    Err(err) => tracing::warn!(local_tab_id = local, error = %err, "Failed to register tab"),
                }
            })?;
        Ok(())
    }

    /// A tab was closed. Its remote tab is closed for everyone, including
    /// other windows of this client bound to the same session.
    pub fn on_tab_removed(&self, local: LocalTabId) -> Result<()> {
        self.leave_session(local)
    }

    /// A tab was dragged into `window`
    pub fn on_tab_attached(&self, window: WindowId, local: LocalTabId, url: &str) -> Result<()> {
        self.on_tab_created(window, local, url)
    }

    /// A tab was dragged out of its window. It stays open but leaves the
    /// session.
    pub fn on_tab_detached(&self, local: LocalTabId) -> Result<()> {
        self.leave_session(local)
    }

    /// Strip order is not synchronized; only the local snapshot follows.
    pub fn on_tab_moved(&self, window: WindowId, local: LocalTabId, to_index: usize) {
        let mut state = self.state.lock();
        let Some(remote) = state.ids.get_remote(local) else {
            return;
        };
        if let Some(binding) = state.cache.binding(window) {
            let session_id = binding.session_id;
            let mut snapshot = binding.snapshot.clone();
            snapshot.move_tab(remote, to_index);
            state.cache.set_snapshot(&snapshot);
            tracing::debug!(window_id = window, session_id, tab_id = remote, to_index, "Tab moved");
        }
    }

    /// The host swapped one tab for another (prerender, discard). The
    /// remote identity carries over.
    pub fn on_tab_replaced(&self, added: LocalTabId, removed: LocalTabId) {
        let mut state = self.state.lock();
        let Some(remote) = state.ids.remove_local(removed) else {
            return;
        };
        state.ids.add(added, remote);
        if let Some(window) = state.cache.untrack_tab(removed) {
            state.cache.track_tab(added, window);
        }
        tracing::debug!(added, removed, tab_id = remote, "Tab replaced");
    }

    /// A navigation completed in a shared tab
    pub fn on_navigation(&self, local: LocalTabId, url: &str) -> Result<()> {
        let (tab, siblings) = {
            let mut state = self.state.lock();
            let Some(remote) = state.ids.get_remote(local) else {
                return Ok(());
            };
            let Some(session_id) = state
                .cache
                .window_of(local)
                .and_then(|window| state.cache.session_of(window))
            else {
                return Ok(());
            };

            let tab = Tab::new(remote, session_id, url.to_string())?;
            let known = state
                .cache
                .windows_for_session(session_id)
                .first()
                .and_then(|window| state.cache.binding(*window))
                .and_then(|binding| binding.snapshot.tab(remote))
                .is_some_and(|current| current.url == tab.url);
            if known {
                // Echo of a navigation the coordinator told us about
                return Ok(());
            }
            state.cache.upsert_tab(&tab);
            let siblings: Vec<LocalTabId> = state
                .ids
                .get_locals(remote)
                .map(|locals| locals.iter().copied().filter(|other| *other != local).collect())
                .unwrap_or_default();
            (tab, siblings)
        };

        // Copies of the tab in our other windows on this session
        for sibling in siblings {
            if let Err(err) = self.host.navigate_tab(sibling, &tab.url) {
                tracing::warn!(local_tab_id = sibling, error = %err, "Failed to navigate mirrored tab");
            }
        }

        self.rpc.request(
            RequestBody::NavigationRequest(NavigationRequest {
                url: tab.url,
                session_id: Some(tab.session_id),
                tab_id: Some(tab.id),
            }),
            move |result| {
                if let Err(err) = result {
                    tracing::warn!(local_tab_id = local, error = %err, "Navigation not shared");
                }
            },
        )?;
        Ok(())
    }

    fn leave_session(&self, local: LocalTabId) -> Result<()> {
        let (session_id, remote, others) = {
            let mut state = self.state.lock();
            let window = state.cache.untrack_tab(local);
            let Some(remote) = state.ids.remove_local(local) else {
                return Ok(());
            };
            let Some(session_id) = window.and_then(|w| state.cache.session_of(w)) else {
                return Ok(());
            };
            state.cache.remove_tab(session_id, remote);
            let others = state.forget_remote(remote);
            (session_id, remote, others)
        };

        for other in others {
            if let Err(err) = self.host.close_tab(other) {
                tracing::warn!(local_tab_id = other, error = %err, "Failed to close mirrored tab");
            }
        }

        self.rpc.request(
            RequestBody::CloseTabRequest(CloseTabRequest {
                session_id,
                tab_id: remote,
            }),
            move |result| {
                if let Err(err) = result {
                    tracing::warn!(session_id, tab_id = remote, error = %err, "Failed to close remote tab");
                }
            },
        )?;
        Ok(())
    }
}

fn open_tab_request(session_id: SessionId, url: String) -> RequestBody {
    RequestBody::OpenTabRequest(OpenTabRequest {
        session_id,
        url,
        tab_id: None,
    })
}

fn unexpected(expected: &'static str, body: &ResponseBody) -> CoreError {
    CoreError::Rpc(RpcError::UnexpectedResponse {
        expected,
        got: body.kind(),
    })
}

/// One step of bringing a window in line with a session snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    /// An unmapped local tab already shows the remote tab
    Adopt { local: LocalTabId, remote: TabId },
    Open { remote: TabId, url: String },
    Close { local: LocalTabId, remote: TabId },
    Navigate { local: LocalTabId, url: String },
}

/// Diff a window's local tabs against `session`.
///
/// Mapped tabs missing from the session are closed, remote tabs missing
/// from the window are adopted (an unmapped tab with the same URL) or
/// opened. Unmapped tabs with no counterpart are left alone.
pub(crate) fn plan_reconcile(
    ids: &TabIdMap,
    local_tabs: &[(LocalTabId, String)],
    session: &Session,
) -> Vec<Action> {
    let wanted: HashMap<TabId, &Tab> = session.tabs.iter().map(|t| (t.id, t)).collect();
    let mut present: HashMap<TabId, LocalTabId> = HashMap::new();
    let mut unmapped: Vec<(LocalTabId, &str)> = Vec::new();
    let mut actions = Vec::new();

    for (local, url) in local_tabs {
        match ids.get_remote(*local) {
            Some(remote) if wanted.contains_key(&remote) && !present.contains_key(&remote) => {
                present.insert(remote, *local);
                let target = &wanted[&remote].url;
                if !target.is_empty() && target != url {
                    actions.push(Action::Navigate {
                        local: *local,
                        url: target.clone(),
                    });
                }
            }
            Some(remote) => actions.push(Action::Close {
                local: *local,
                remote,
            }),
            None => unmapped.push((*local, url.as_str())),
        }
    }

    for tab in &session.tabs {
        if present.contains_key(&tab.id) {
            continue;
        }
        match unmapped.iter().position(|(_, url)| *url == tab.url) {
            Some(index) => {
                let (local, _) = unmapped.remove(index);
                actions.push(Action::Adopt {
                    local,
                    remote: tab.id,
                });
            }
            None => actions.push(Action::Open {
                remote: tab.id,
                url: tab.url.clone(),
            }),
        }
    }

    actions
}

/// Open `tab` in every window bound to its session that does not show it yet
pub(crate) fn mirror_tab(state: &Mutex<ClientState>, host: &dyn TabHost, tab: &Tab) {
    let windows: Vec<WindowId> = {
        let state = state.lock();
        let locals = state.ids.get_locals(tab.id);
        state
            .cache
            .windows_for_session(tab.session_id)
            .into_iter()
            .filter(|window| {
                !locals.is_some_and(|locals| {
                    locals
                        .iter()
                        .any(|local| state.cache.window_of(*local) == Some(*window))
                })
            })
            .collect()
    };

    for window in windows {
        match host.open_tab(window, &tab.url) {
            Ok(local) => {
                tracing::debug!(window_id = window, local_tab_id = local, tab_id = tab.id, "Mirrored tab");
                state.lock().adopt(window, local, tab);
            }
            Err(err) => tracing::warn!(window_id = window, tab_id = tab.id, error = %err, "Failed to mirror tab"),
        }
    }
}

/// Bring `window` in line with `session` through the host.
///
/// Individual host failures are logged and skipped so one stale tab does
/// not block the rest.
pub(crate) fn reconcile_window(
    state: &Mutex<ClientState>,
    host: &dyn TabHost,
    window: WindowId,
    session: &Session,
) -> Result<()> {
    let local_tabs = host.window_tabs(window)?;
    let actions = plan_reconcile(&state.lock().ids, &local_tabs, session);
    tracing::debug!(window_id = window, session_id = session.id, actions = actions.len(), "Reconciling window");

    for action in actions {
        match action {
            Action::Adopt { local, remote } => {
                let mut state = state.lock();
                state.ids.add(local, remote);
                state.cache.track_tab(local, window);
            }
            Action::Open { remote, url } => match host.open_tab(window, &url) {
                Ok(local) => {
                    let mut state = state.lock();
                    state.ids.add(local, remote);
                    state.cache.track_tab(local, window);
                }
                Err(err) => tracing::warn!(window_id = window, tab_id = remote, error = %err, "Failed to open tab"),
            },
            Action::Close { local, remote } => {
                {
                    let mut state = state.lock();
                    state.ids.remove(local, remote);
                    state.cache.untrack_tab(local);
                }
                if let Err(err) = host.close_tab(local) {
                    tracing::warn!(local_tab_id = local, error = %err, "Failed to close tab");
                }
            }
            Action::Navigate { local, url } => {
                if let Err(err) = host.navigate_tab(local, &url) {
                    tracing::warn!(local_tab_id = local, error = %err, "Failed to navigate tab");
                }
            }
        }
    }

    state.lock().cache.set_snapshot(session);
    Ok(())
}
