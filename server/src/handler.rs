//! Coordinator side of the protocol: every request maps onto the store

use tabsync_rpc::{
    CloseTabRequest, CloseTabResponse, ConnectToSessionRequest, ConnectToSessionResponse,
    CreateSessionRequest, CreateSessionResponse, DisconnectFromSessionRequest,
    DisconnectFromSessionResponse, HandlerResult, ListSessionsRequest, ListSessionsResponse,
    NavigationRequest, NavigationResponse, OpenTabRequest, OpenTabResponse, RequestContext,
    RequestHandler, ResponseBody, SendStateRequest, SendStateResponse,
};
use tabsync_session::ClientId;

use crate::state::ServerState;

/// Handles the requests of one client connection
pub struct CoordinatorHandler {
    client_id: ClientId,
    state: ServerState,
}

impl CoordinatorHandler {
    pub fn new(client_id: ClientId, state: ServerState) -> Self {
        Self { client_id, state }
    }
}

impl RequestHandler for CoordinatorHandler {
    fn handle_list_sessions(&self, _: &RequestContext, _: ListSessionsRequest) -> HandlerResult {
        let sessions = self.state.with_store(|store| store.list_sessions());
        Ok(Some(ResponseBody::ListSessionsResponse(ListSessionsResponse {
            sessions,
        })))
    }

    fn handle_create_session(&self, _: &RequestContext, req: CreateSessionRequest) -> HandlerResult {
        let session = self
            .state
            .with_store(|store| store.create_session(self.client_id, req.session_type));
        Ok(Some(ResponseBody::CreateSessionResponse(
            CreateSessionResponse { session },
        )))
    }

    fn handle_connect_to_session(
        &self,
        _: &RequestContext,
        req: ConnectToSessionRequest,
    ) -> HandlerResult {
        let session = self
            .state
            .with_store(|store| store.connect_to_session(self.client_id, req.id))?;
        Ok(Some(ResponseBody::ConnectToSessionResponse(
            ConnectToSessionResponse { session },
        )))
    }

    fn handle_disconnect_from_session(
        &self,
        _: &RequestContext,
        req: DisconnectFromSessionRequest,
    ) -> HandlerResult {
        self.state
            .with_store(|store| store.disconnect_from_session(self.client_id, req.id))?;
        Ok(Some(ResponseBody::DisconnectFromSessionResponse(
            DisconnectFromSessionResponse {},
        )))
    }

    fn handle_send_state(&self, _: &RequestContext, req: SendStateRequest) -> HandlerResult {
        let merged = self
            .state
            .apply(|store| store.merge_session(self.client_id, req.session))?;
        Ok(Some(ResponseBody::SendStateResponse(SendStateResponse {
            session: Some(merged),
        })))
    }

    fn handle_open_tab(&self, _: &RequestContext, req: OpenTabRequest) -> HandlerResult {
        if req.tab_id.is_some() {
            tracing::debug!(client_id = self.client_id, "Ignoring client-supplied tab ID");
        }
        let tab = self
            .state
            .apply(|store| store.open_tab(self.client_id, req.session_id, req.url))?;
        Ok(Some(ResponseBody::OpenTabResponse(OpenTabResponse { tab })))
    }

    fn handle_close_tab(&self, _: &RequestContext, req: CloseTabRequest) -> HandlerResult {
        self.state
            .apply(|store| store.close_tab(self.client_id, req.session_id, req.tab_id))?;
        Ok(Some(ResponseBody::CloseTabResponse(CloseTabResponse {})))
    }

    fn handle_navigation(&self, _: &RequestContext, req: NavigationRequest) -> HandlerResult {
        match (req.session_id, req.tab_id) {
            (Some(session_id), Some(tab_id)) => {
                self.state.apply(|store| {
                    store.navigate_tab(self.client_id, session_id, tab_id, req.url)
                })?;
            }
            _ => tracing::debug!(client_id = self.client_id, url = %req.url, "Navigation acknowledged"),
        }
        Ok(Some(ResponseBody::NavigationResponse(NavigationResponse {})))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tabsync_core::Config;
    use tabsync_rpc::{ChannelTransport, HandlerError};
    use tabsync_session::{Session, SessionType};
    use tabsync_tabs::Tab;

    const CX: RequestContext = RequestContext {
        request_id: 1,
        message_id: 1,
    };

    fn handler(state: &ServerState) -> CoordinatorHandler {
        // Pushes to this client are not inspected here, so its outbound side is dropped
        let (transport, _) = ChannelTransport::new();
        let (client_id, _) = state.open_channel(Arc::new(transport), None);
        CoordinatorHandler::new(client_id, state.clone())
    }

    fn body<T>(result: HandlerResult, pick: impl FnOnce(ResponseBody) -> Option<T>) -> T {
        pick(result.unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_session_lifecycle() {
        let state = ServerState::new(Config::default());
        let a = handler(&state);
        let b = handler(&state);

        let session = body(
            a.handle_create_session(&CX, CreateSessionRequest::default()),
            |response| match response {
                ResponseBody::CreateSessionResponse(r) => Some(r.session),
                _ => None,
            },
        );
        assert_eq!(session, Session::new(1, SessionType::Window));

        let tab = body(
            a.handle_open_tab(
                &CX,
                OpenTabRequest {
                    session_id: 1,
                    url: "https://a".to_string(),
                    tab_id: None,
                },
            ),
            |response| match response {
                ResponseBody::OpenTabResponse(r) => Some(r.tab),
                _ => None,
            },
        );
        assert_eq!(tab, Tab::new(1, 1, "https://a".to_string()).unwrap());

        let seen = body(
            b.handle_connect_to_session(&CX, ConnectToSessionRequest { id: 1 }),
            |response| match response {
                ResponseBody::ConnectToSessionResponse(r) => Some(r.session),
                _ => None,
            },
        );
        assert_eq!(seen.tabs, vec![tab]);

        let listed = body(a.handle_list_sessions(&CX, ListSessionsRequest {}), |response| match response {
            ResponseBody::ListSessionsResponse(r) => Some(r.sessions),
            _ => None,
        });
        assert_eq!(listed, vec![seen]);
    }

    #[test]
    fn test_errors_map_to_handler_errors() {
        let state = ServerState::new(Config::default());
        let a = handler(&state);

        assert!(matches!(
            a.handle_connect_to_session(&CX, ConnectToSessionRequest { id: 5 }),
            Err(HandlerError::NotFound(_))
        ));
        assert!(matches!(
            a.handle_close_tab(
                &CX,
                CloseTabRequest {
                    session_id: 5,
                    tab_id: 1
                }
            ),
            Err(HandlerError::NotFound(_))
        ));

        a.handle_create_session(&CX, CreateSessionRequest::default())
            .unwrap();
        assert!(matches!(
            a.handle_open_tab(
                &CX,
                OpenTabRequest {
                    session_id: 1,
                    url: "::".to_string(),
                    tab_id: None,
                }
            ),
            Err(HandlerError::Invalid(_))
        ));
    }

    #[test]
    fn test_bare_navigation_is_acknowledged() {
        let state = ServerState::new(Config::default());
        let a = handler(&state);

        let result = a.handle_navigation(
            &CX,
            NavigationRequest {
                url: "https://a".to_string(),
                session_id: None,
                tab_id: None,
            },
        );

        assert_eq!(
            result,
            Ok(Some(ResponseBody::NavigationResponse(NavigationResponse {})))
        );
        assert!(state.with_store(|s| s.is_empty()));
    }

    #[test]
    fn test_send_state_answers_with_merged_session() {
        let state = ServerState::new(Config::default());
        let a = handler(&state);
        a.handle_create_session(&CX, CreateSessionRequest::default())
            .unwrap();

        let mut pushed = Session::new(1, SessionType::Window);
        pushed
            .tabs
            .push(Tab::new(0, 1, "https://a".to_string()).unwrap());

        let merged = body(
            a.handle_send_state(&CX, SendStateRequest { session: pushed }),
            |response| match response {
                ResponseBody::SendStateResponse(r) => r.session,
                _ => None,
            },
        );
        assert_eq!(merged.tab_ids(), vec![1]);
    }
}
