//! Inbound request handling

use tabsync_session::SessionError;
use thiserror::Error;

use crate::message::{
    CloseTabRequest, ConnectToSessionRequest, CreateSessionRequest, DisconnectFromSessionRequest,
    ErrorCode, ErrorResponse, ListSessionsRequest, NavigationRequest, OpenTabRequest, ResponseBody,
    SendStateRequest,
};

/// Identifies the inbound request being handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: u64,
    pub message_id: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// This endpoint never accepts the request kind. Fatal to the connection.
    #[error("Unsupported request: {0}")]
    Unsupported(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl HandlerError {
    /// The error payload sent back to the requester, if any
    pub fn to_response(&self) -> Option<ErrorResponse> {
        match self {
            HandlerError::Unsupported(_) => None,
            HandlerError::NotFound(message) => Some(ErrorResponse {
                code: ErrorCode::NotFound,
                message: message.clone(),
            }),
            HandlerError::Invalid(message) => Some(ErrorResponse {
                code: ErrorCode::InvalidRequest,
                message: message.clone(),
            }),
        }
    }
}

impl From<SessionError> for HandlerError {
    fn from(err: SessionError) -> Self {
        if err.is_not_found() {
            HandlerError::NotFound(err.to_string())
        } else {
            HandlerError::Invalid(err.to_string())
        }
    }
}

/// `Ok(Some(_))` is sent back as the response, `Ok(None)` sends nothing.
pub type HandlerResult = Result<Option<ResponseBody>, HandlerError>;

/// One method per request kind. Each endpoint implements the kinds it
/// accepts and answers the rest with `HandlerError::Unsupported`.
pub trait RequestHandler: Send + Sync {
    fn handle_list_sessions(&self, cx: &RequestContext, req: ListSessionsRequest) -> HandlerResult;

    fn handle_create_session(&self, cx: &RequestContext, req: CreateSessionRequest) -> HandlerResult;

    fn handle_connect_to_session(
        &self,
        cx: &RequestContext,
        req: ConnectToSessionRequest,
    ) -> HandlerResult;

    fn handle_disconnect_from_session(
        &self,
        cx: &RequestContext,
        req: DisconnectFromSessionRequest,
    ) -> HandlerResult;

    fn handle_send_state(&self, cx: &RequestContext, req: SendStateRequest) -> HandlerResult;

    fn handle_open_tab(&self, cx: &RequestContext, req: OpenTabRequest) -> HandlerResult;

    fn handle_close_tab(&self, cx: &RequestContext, req: CloseTabRequest) -> HandlerResult;

    fn handle_navigation(&self, cx: &RequestContext, req: NavigationRequest) -> HandlerResult;
}
