//! RPC error types

use thiserror::Error;

use crate::handler::HandlerError;
use crate::message::ErrorCode;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Request {request_id} timed out")]
    Timeout { request_id: u64 },

    #[error("Connection closed before request {request_id} was answered")]
    Closed { request_id: u64 },

    #[error("Remote error {code}: {message}")]
    Remote { code: ErrorCode, message: String },

    #[error("Expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Protocol contract violated: {0}")]
    Contract(#[from] HandlerError),

    #[error("Response channel dropped")]
    Canceled,
}

impl RpcError {
    /// Errors after which the connection must not be used any further
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Contract(HandlerError::Unsupported(_)))
    }
}
