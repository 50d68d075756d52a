//! Frame transport seam
//!
//! The channel only needs to push text frames out. Inbound frames, errors
//! and close are fed to it as `TransportEvent`s by whoever owns the socket.

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

pub trait Transport: Send + Sync {
    fn send(&self, frame: String) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    Error(String),
    Closed,
}

/// Outbound frames go into an unbounded queue drained by a socket writer task.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: String) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_after_receiver_dropped() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.send("a".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "a");

        drop(rx);
        assert!(transport.is_closed());
        assert_eq!(transport.send("b".to_string()), Err(TransportError::Closed));
    }
}
