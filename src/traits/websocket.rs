//! WebSocket transport trait abstraction.
//!
//! Provides a trait-based abstraction for opening client-side WebSocket
//! connections, enabling dependency injection and mocking in tests. An open
//! connection is represented by a pair of channels so the lifecycle state
//! machine never depends on a concrete socket type.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// WebSocket connection errors.
#[derive(Debug, Clone, PartialEq)]
pub enum WsError {
    /// Connection failed
    ConnectionFailed(String),
}

impl std::fmt::Display for WsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WsError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
        }
    }
}

impl std::error::Error for WsError {}

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text frame from the server
    Text(String),
    /// The server closed the connection
    Closed,
    /// The connection failed
    Error(String),
}

/// Channel ends of one open connection.
///
/// Dropping `outgoing` closes the connection from the client side.
#[derive(Debug)]
pub struct Transport {
    /// Text frames to send to the server
    pub outgoing: mpsc::Sender<String>,
    /// Frames and lifecycle notifications from the server
    pub incoming: mpsc::Receiver<TransportEvent>,
}

/// Trait for opening WebSocket connections.
///
/// # Example
///
/// ```ignore
/// use chatrelay::traits::Connector;
///
/// async fn open<C: Connector>(connector: &C) {
///     let transport = connector.connect("ws://localhost:10087").await?;
///     transport.outgoing.send("{...}".to_string()).await?;
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Transport, WsError>;
}
