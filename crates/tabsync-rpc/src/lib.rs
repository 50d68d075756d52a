//! Tabsync RPC
//!
//! A bidirectional request/response protocol multiplexed over one duplex
//! connection. Both ends run the same `Rpc` channel; they differ only in the
//! `RequestHandler` they plug into it.
//!
//! Every envelope carries a `messageId`. Requests additionally carry a
//! `requestId`, and a response echoes it back as `responseId`; that pair is
//! the only correlation key.

mod channel;
mod driver;
mod error;
mod handler;
mod message;
mod transport;

pub use channel::{ResponseCallback, Rpc};
pub use driver::drive;
pub use error::RpcError;
pub use handler::{HandlerError, HandlerResult, RequestContext, RequestHandler};
pub use message::{
    CloseTabRequest, CloseTabResponse, ConnectToSessionRequest, ConnectToSessionResponse,
    CreateSessionRequest, CreateSessionResponse, DisconnectFromSessionRequest,
    DisconnectFromSessionResponse, Envelope, ErrorCode, ErrorResponse, ListSessionsRequest,
    ListSessionsResponse, NavigationRequest, NavigationResponse, OpenTabRequest, OpenTabResponse,
    Payload, Request, RequestBody, Response, ResponseBody, SendStateRequest, SendStateResponse,
};
pub use transport::{ChannelTransport, Transport, TransportError, TransportEvent};

pub type Result<T> = std::result::Result<T, RpcError>;
