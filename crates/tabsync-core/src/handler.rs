//! Requests the coordinator pushes to a client

use parking_lot::Mutex;
use std::sync::Arc;
use tabsync_rpc::{
    CloseTabRequest, ConnectToSessionRequest, CreateSessionRequest, DisconnectFromSessionRequest,
    HandlerError, HandlerResult, ListSessionsRequest, NavigationRequest, OpenTabRequest,
    RequestContext, RequestHandler, SendStateRequest,
};
use tabsync_tabs::Tab;

use crate::client::{mirror_tab, reconcile_window, ClientState};
use crate::host::TabHost;

/// Applies coordinator pushes to the windows bound to the pushed session.
/// Pushes are fire-and-forget, so nothing here replies.
pub struct ClientHandler {
    state: Arc<Mutex<ClientState>>,
    host: Arc<dyn TabHost>,
}

impl ClientHandler {
    pub fn new(state: Arc<Mutex<ClientState>>, host: Arc<dyn TabHost>) -> Self {
        Self { state, host }
    }

    fn unsupported(&self, cx: &RequestContext, kind: &'static str) -> HandlerResult {
        tracing::error!(request_id = cx.request_id, kind, "Coordinator-only request received by client");
        Err(HandlerError::Unsupported(kind))
    }
}

impl RequestHandler for ClientHandler {
    fn handle_list_sessions(&self, cx: &RequestContext, _: ListSessionsRequest) -> HandlerResult {
        self.unsupported(cx, "listSessionsRequest")
    }

    fn handle_create_session(&self, cx: &RequestContext, _: CreateSessionRequest) -> HandlerResult {
        self.unsupported(cx, "createSessionRequest")
    }

    fn handle_connect_to_session(
        &self,
        cx: &RequestContext,
        _: ConnectToSessionRequest,
    ) -> HandlerResult {
        self.unsupported(cx, "connectToSessionRequest")
    }

    fn handle_disconnect_from_session(
        &self,
        cx: &RequestContext,
        _: DisconnectFromSessionRequest,
    ) -> HandlerResult {
        self.unsupported(cx, "disconnectFromSessionRequest")
    }

    fn handle_send_state(&self, _: &RequestContext, req: SendStateRequest) -> HandlerResult {
        let windows = self.state.lock().cache.windows_for_session(req.session.id);
        tracing::debug!(session_id = req.session.id, windows = windows.len(), "Session state pushed");

        for window in windows {
            if let Err(err) = reconcile_window(&self.state, self.host.as_ref(), window, &req.session) {
                tracing::warn!(window_id = window, error = %err, "Failed to apply session state");
            }
        }
        Ok(None)
    }

    fn handle_open_tab(&self, _: &RequestContext, req: OpenTabRequest) -> HandlerResult {
        let Some(tab_id) = req.tab_id else {
            tracing::warn!(session_id = req.session_id, "Tab push without tab ID ignored");
            return Ok(None);
        };
        let tab = Tab::new(tab_id, req.session_id, req.url)
            .map_err(|e| HandlerError::Invalid(e.to_string()))?;

        mirror_tab(&self.state, self.host.as_ref(), &tab);
        Ok(None)
    }

    fn handle_close_tab(&self, _: &RequestContext, req: CloseTabRequest) -> HandlerResult {
        let locals = {
            let mut state = self.state.lock();
            state.cache.remove_tab(req.session_id, req.tab_id);
            state.forget_remote(req.tab_id)
        };

        for local in locals {
            if let Err(err) = self.host.close_tab(local) {
                tracing::warn!(local_tab_id = local, tab_id = req.tab_id, error = %err, "Failed to close tab");
            }
        }
        Ok(None)
    }

    fn handle_navigation(&self, _: &RequestContext, req: NavigationRequest) -> HandlerResult {
        let (Some(session_id), Some(tab_id)) = (req.session_id, req.tab_id) else {
            return Ok(None);
        };
        let tab = Tab::new(tab_id, session_id, req.url)
            .map_err(|e| HandlerError::Invalid(e.to_string()))?;

        let locals: Vec<_> = {
            let mut state = self.state.lock();
            state.cache.upsert_tab(&tab);
            state
                .ids
                .get_locals(tab_id)
                .map(|locals| locals.iter().copied().collect())
                .unwrap_or_default()
        };

        for local in locals {
            if let Err(err) = self.host.navigate_tab(local, &tab.url) {
                tracing::warn!(local_tab_id = local, tab_id, error = %err, "Failed to navigate tab");
            }
        }
        Ok(None)
    }
}
