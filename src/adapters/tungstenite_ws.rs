//! Tungstenite-based WebSocket adapter.
//!
//! This module provides the production [`Connector`]: each connection is
//! driven by a background task that bridges the socket to the channel pair
//! of a [`Transport`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};

use crate::traits::{Connector, Transport, TransportEvent, WsError};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default capacity of the per-connection channels
const CHANNEL_CAPACITY: usize = 100;

/// WebSocket connector using tokio-tungstenite.
///
/// # Example
///
/// ```ignore
/// use chatrelay::adapters::TungsteniteConnector;
/// use chatrelay::traits::Connector;
///
/// let connector = TungsteniteConnector::new();
/// let transport = connector.connect("ws://127.0.0.1:10087/ws").await?;
/// ```
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    capacity: usize,
}

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self {
            capacity: CHANNEL_CAPACITY,
        }
    }

    /// Set the capacity of the send and receive channels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Transport, WsError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        info!("Connected to WebSocket server at {}", url);

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<String>(self.capacity);
        let (incoming_tx, incoming_rx) = mpsc::channel::<TransportEvent>(self.capacity);

        tokio::spawn(run_socket(socket, outgoing_rx, incoming_tx));

        Ok(Transport {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}

/// Bridge one socket to its channels until either side goes away
async fn run_socket(
    socket: Socket,
    mut outgoing: mpsc::Receiver<String>,
    incoming: mpsc::Sender<TransportEvent>,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if incoming.send(TransportEvent::Text(text)).await.is_err() {
                            debug!("Incoming channel closed, closing socket");
                            let _ = ws_sink.close().await;
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        debug!("Received ping, sending pong");
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket closed by server");
                        let _ = incoming.send(TransportEvent::Closed).await;
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong and raw frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        let _ = incoming.send(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                }
            }
            text = outgoing.recv() => {
                match text {
                    Some(text) => {
                        if let Err(e) = ws_sink.send(Message::Text(text)).await {
                            error!("Failed to send frame: {}", e);
                            let _ = incoming.send(TransportEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                    None => {
                        debug!("Outgoing channel closed, closing socket");
                        let _ = ws_sink.close().await;
                        break;
                    }
                }
            }
        }
    }

    debug!("Socket task ended");
}
