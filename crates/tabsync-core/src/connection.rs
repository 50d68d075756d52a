//! WebSocket connection from a client to the coordinator

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tabsync_rpc::{drive, ChannelTransport, TransportEvent};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::client::Client;
use crate::host::TabHost;
use crate::Result;

/// How often pending requests are checked for expiry
const EXPIRY_TICK: Duration = Duration::from_millis(500);

/// A connected client and the task driving its channel
pub struct Connection {
    client: Client,
    driver: JoinHandle<tabsync_rpc::Result<()>>,
}

impl Connection {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Wait until the coordinator goes away or the protocol breaks
    pub async fn closed(&mut self) -> Result<()> {
        match (&mut self.driver).await {
            Ok(result) => Ok(result?),
            Err(err) => Err(std::io::Error::other(err).into()),
        }
    }

    pub fn abort(&self) {
        self.driver.abort();
    }
}

/// Connect to the coordinator at `url` and start driving a `Client`
pub async fn connect(
    url: &str,
    host: Arc<dyn TabHost>,
    request_timeout: Option<Duration>,
) -> Result<Connection> {
    let (ws_stream, _) = connect_async(url).await?;
    tracing::info!(url, "Connected to coordinator");

    let (transport, outbound) = ChannelTransport::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(pump_socket(ws_stream, outbound, events_tx, shutdown_rx));

    let client = Client::new(Arc::new(transport), host, request_timeout);
    let rpc = client.rpc().clone();
    let driver = tokio::spawn(async move {
        let result = drive(rpc, events_rx, EXPIRY_TICK).await;
        // The channel is closed now; take the socket down with it
        let _ = shutdown_tx.send(());
        result
    });

    Ok(Connection { client, driver })
}

/// Move frames between the socket and the channel until either side ends.
/// `shutdown` fires (or is dropped) once the driver has stopped.
async fn pump_socket(
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(err) = ws_sender.send(Message::Text(frame.into())).await {
                tracing::warn!(error = %err, "Failed to write frame");
                break;
            }
        }
        let _ = ws_sender.send(Message::Close(None)).await;
    });

    loop {
        let msg = tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(msg) => msg,
                None => break,
            },
            _ = &mut shutdown => {
                tracing::debug!("Driver stopped, closing socket");
                break;
            }
        };
        let event = match msg {
            Ok(Message::Text(text)) => TransportEvent::Message(text.to_string()),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => TransportEvent::Message(text),
                Err(err) => TransportEvent::Error(format!("binary frame is not UTF-8: {}", err)),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                let _ = events.send(TransportEvent::Error(err.to_string()));
                break;
            }
        };
        if events.send(event).is_err() {
            break;
        }
    }

    let _ = events.send(TransportEvent::Closed);
    send_task.abort();
    tracing::info!("Coordinator connection closed");
}
