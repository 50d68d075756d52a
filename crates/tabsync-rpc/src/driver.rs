//! Event loop feeding one connection's transport events into its channel.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use crate::channel::Rpc;
use crate::transport::TransportEvent;
use crate::Result;

/// Run `rpc` until the transport closes or a fatal protocol error occurs.
///
/// Pending requests are checked for expiry every `tick`. On return every
/// request still pending has been failed with `RpcError::Closed`.
pub async fn drive(
    rpc: Arc<Rpc>,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    tick: Duration,
) -> Result<()> {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let result = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TransportEvent::Message(frame)) => {
                    if let Err(err) = rpc.on_message(&frame) {
                        if err.is_fatal() {
                            break Err(err);
                        }
                        tracing::warn!(channel = %rpc.name(), error = %err, "Failed to handle frame");
                    }
                }
                Some(TransportEvent::Error(error)) => rpc.on_error(&error),
                Some(TransportEvent::Closed) | None => break Ok(()),
            },
            _ = interval.tick() => {
                rpc.expire_pending(Instant::now());
            }
        }
    };

    rpc.on_close();
    result
}
