//! Wire messages
//!
//! JSON shape:
//! ```text
//! { "messageId": 3, "request":  { "requestId": 2,  "openTabRequest": { "sessionId": 1 } } }
//! { "messageId": 4, "response": { "responseId": 2, "openTabResponse": { "tab": { ... } } } }
//! ```
//! The request/response kind is the single populated one-of key, modelled
//! here as an externally tagged enum flattened into its parent.

use serde::{Deserialize, Serialize};
use tabsync_session::{Session, SessionType};
use tabsync_tabs::{SessionId, Tab, TabId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub message_id: u64,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    pub fn request(message_id: u64, request: Request) -> Self {
        Self {
            message_id,
            payload: Payload::Request(request),
        }
    }

    pub fn response(message_id: u64, response: Response) -> Self {
        Self {
            message_id,
            payload: Payload::Response(response),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Payload {
    Request(Request),
    Response(Response),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestBody {
    ListSessionsRequest(ListSessionsRequest),
    CreateSessionRequest(CreateSessionRequest),
    ConnectToSessionRequest(ConnectToSessionRequest),
    DisconnectFromSessionRequest(DisconnectFromSessionRequest),
    SendStateRequest(SendStateRequest),
    OpenTabRequest(OpenTabRequest),
    CloseTabRequest(CloseTabRequest),
    NavigationRequest(NavigationRequest),
}

impl RequestBody {
    /// Wire name of the populated variant
    pub fn kind(&self) -> &'static str {
        match self {
            RequestBody::ListSessionsRequest(_) => "listSessionsRequest",
            RequestBody::CreateSessionRequest(_) => "createSessionRequest",
            RequestBody::ConnectToSessionRequest(_) => "connectToSessionRequest",
            RequestBody::DisconnectFromSessionRequest(_) => "disconnectFromSessionRequest",
            RequestBody::SendStateRequest(_) => "sendStateRequest",
            RequestBody::OpenTabRequest(_) => "openTabRequest",
            RequestBody::CloseTabRequest(_) => "closeTabRequest",
            RequestBody::NavigationRequest(_) => "navigationRequest",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSessionsRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_type: SessionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectToSessionRequest {
    pub id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectFromSessionRequest {
    pub id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendStateRequest {
    pub session: Session,
}

/// Sent by a client to register a tab, and by the coordinator (with `tab_id`
/// set) to tell other members about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTabRequest {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTabRequest {
    pub session_id: SessionId,
    pub tab_id: TabId,
}

/// A completed navigation. Without `session_id`/`tab_id` it is a bare
/// notification the coordinator only acknowledges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub response_id: u64,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl Response {
    pub fn new(response_id: u64, body: ResponseBody) -> Self {
        Self { response_id, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseBody {
    ListSessionsResponse(ListSessionsResponse),
    CreateSessionResponse(CreateSessionResponse),
    ConnectToSessionResponse(ConnectToSessionResponse),
    DisconnectFromSessionResponse(DisconnectFromSessionResponse),
    SendStateResponse(SendStateResponse),
    OpenTabResponse(OpenTabResponse),
    CloseTabResponse(CloseTabResponse),
    NavigationResponse(NavigationResponse),
    ErrorResponse(ErrorResponse),
}

impl ResponseBody {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseBody::ListSessionsResponse(_) => "listSessionsResponse",
            ResponseBody::CreateSessionResponse(_) => "createSessionResponse",
            ResponseBody::ConnectToSessionResponse(_) => "connectToSessionResponse",
            ResponseBody::DisconnectFromSessionResponse(_) => "disconnectFromSessionResponse",
            ResponseBody::SendStateResponse(_) => "sendStateResponse",
            ResponseBody::OpenTabResponse(_) => "openTabResponse",
            ResponseBody::CloseTabResponse(_) => "closeTabResponse",
            ResponseBody::NavigationResponse(_) => "navigationResponse",
            ResponseBody::ErrorResponse(_) => "errorResponse",
        }
    }

    /// Whether this is a valid answer to `request`. An error answers anything.
    pub fn answers(&self, request: &RequestBody) -> bool {
        matches!(
            (request, self),
            (_, ResponseBody::ErrorResponse(_))
                | (RequestBody::ListSessionsRequest(_), ResponseBody::ListSessionsResponse(_))
                | (RequestBody::CreateSessionRequest(_), ResponseBody::CreateSessionResponse(_))
                | (
                    RequestBody::ConnectToSessionRequest(_),
                    ResponseBody::ConnectToSessionResponse(_)
                )
                | (
                    RequestBody::DisconnectFromSessionRequest(_),
                    ResponseBody::DisconnectFromSessionResponse(_)
                )
                | (RequestBody::SendStateRequest(_), ResponseBody::SendStateResponse(_))
                | (RequestBody::OpenTabRequest(_), ResponseBody::OpenTabResponse(_))
                | (RequestBody::CloseTabRequest(_), ResponseBody::CloseTabResponse(_))
                | (RequestBody::NavigationRequest(_), ResponseBody::NavigationResponse(_))
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectToSessionResponse {
    pub session: Session,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectFromSessionResponse {}

/// Carries the merged session so the pushing client can adopt it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendStateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTabResponse {
    pub tab: Tab,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseTabResponse {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResponse {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidRequest,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let envelope = Envelope::request(
            3,
            Request {
                request_id: 2,
                body: RequestBody::OpenTabRequest(OpenTabRequest {
                    session_id: 1,
                    url: "https://a".to_string(),
                    tab_id: None,
                }),
            },
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            json!({
                "messageId": 3,
                "request": {
                    "requestId": 2,
                    "openTabRequest": { "sessionId": 1, "url": "https://a" }
                }
            })
        );

        let back: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_response_round_trip_keeps_payload() {
        let mut session = Session::new(1, SessionType::Window);
        session.tabs.push(Tab::new(1, 1, "https://a".to_string()).unwrap());

        let envelope = Envelope::response(
            9,
            Response::new(
                4,
                ResponseBody::ConnectToSessionResponse(ConnectToSessionResponse { session }),
            ),
        );

        let text = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back, envelope);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.get("request").is_none());
        assert!(value["response"].get("listSessionsResponse").is_none());
    }

    #[test]
    fn test_empty_messages() {
        let text = r#"{"messageId":1,"request":{"requestId":1,"listSessionsRequest":{}}}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        assert_eq!(
            envelope.payload,
            Payload::Request(Request {
                request_id: 1,
                body: RequestBody::ListSessionsRequest(ListSessionsRequest {}),
            })
        );
        assert_eq!(serde_json::to_string(&envelope).unwrap(), text);
    }

    #[test]
    fn test_optional_fields_default() {
        let text = r#"{"messageId":1,"request":{"requestId":5,"createSessionRequest":{}}}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        let Payload::Request(request) = envelope.payload else {
            panic!("expected a request");
        };
        assert_eq!(
            request.body,
            RequestBody::CreateSessionRequest(CreateSessionRequest {
                session_type: SessionType::Window
            })
        );
    }

    #[test]
    fn test_missing_variant_is_rejected() {
        for text in [
            r#"{"messageId":1}"#,
            r#"{"messageId":1,"request":{"requestId":1}}"#,
            r#"{"messageId":1,"request":{"requestId":1,"bogusRequest":{}}}"#,
            r#"{"messageId":1,"response":{"responseId":1}}"#,
        ] {
            assert!(serde_json::from_str::<Envelope>(text).is_err(), "{text}");
        }
    }

    #[test]
    fn test_answers() {
        let close = RequestBody::CloseTabRequest(CloseTabRequest {
            session_id: 1,
            tab_id: 2,
        });
        assert!(ResponseBody::CloseTabResponse(CloseTabResponse {}).answers(&close));
        assert!(ResponseBody::ErrorResponse(ErrorResponse {
            code: ErrorCode::NotFound,
            message: String::new(),
        })
        .answers(&close));
        assert!(!ResponseBody::NavigationResponse(NavigationResponse {}).answers(&close));
    }
}
