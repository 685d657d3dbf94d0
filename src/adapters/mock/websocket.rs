//! Mock WebSocket connector for testing.
//!
//! Each accepted connection hands the test a [`MockPeer`] that plays the
//! server: it can push frames, close or fail the connection, and read what
//! the client sent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::traits::{Connector, Transport, TransportEvent, WsError};

/// Scripted outcome of one connect attempt
#[derive(Debug, Clone, PartialEq)]
pub enum MockConnect {
    /// Open a connection and publish its peer
    Accept,
    /// Fail with the given reason
    Refuse(String),
}

/// Server side of one mock connection.
#[derive(Debug)]
pub struct MockPeer {
    /// Events delivered to the client
    pub to_client: mpsc::Sender<TransportEvent>,
    /// Text frames the client sent
    pub from_client: mpsc::Receiver<String>,
}

impl MockPeer {
    /// Deliver a text frame to the client.
    pub async fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(TransportEvent::Text(text.into())).await;
    }

    /// Close the connection from the server side.
    pub async fn close(&self) {
        let _ = self.to_client.send(TransportEvent::Closed).await;
    }

    /// Fail the connection with a transport error.
    pub async fn fail(&self, reason: impl Into<String>) {
        let _ = self.to_client.send(TransportEvent::Error(reason.into())).await;
    }

    /// Next frame sent by the client; `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }
}

/// Mock connector with scripted connect outcomes.
///
/// Scripted outcomes are consumed in order; once the script is empty every
/// attempt uses the fallback.
///
/// # Example
///
/// ```ignore
/// use chatrelay::adapters::mock::{MockConnect, MockConnector};
///
/// let connector = MockConnector::new();
/// connector.push(MockConnect::Refuse("down".to_string()));
///
/// // first attempt fails, the next one opens a connection
/// let mut peer = connector.next_peer().await.unwrap();
/// peer.send_text("Hello").await;
/// ```
#[derive(Debug, Clone)]
pub struct MockConnector {
    script: Arc<Mutex<VecDeque<MockConnect>>>,
    fallback: Arc<Mutex<MockConnect>>,
    attempts: Arc<AtomicUsize>,
    urls: Arc<Mutex<Vec<String>>>,
    peers_tx: mpsc::UnboundedSender<MockPeer>,
    peers_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<MockPeer>>>,
}

impl MockConnector {
    /// Connector that accepts every attempt.
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(MockConnect::Accept)),
            attempts: Arc::new(AtomicUsize::new(0)),
            urls: Arc::new(Mutex::new(Vec::new())),
            peers_tx,
            peers_rx: Arc::new(tokio::sync::Mutex::new(peers_rx)),
        }
    }

    /// Connector that refuses every attempt.
    pub fn refusing() -> Self {
        let connector = Self::new();
        connector.set_fallback(MockConnect::Refuse("connection refused".to_string()));
        connector
    }

    /// Queue the outcome of the next unscripted attempt.
    pub fn push(&self, outcome: MockConnect) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Outcome used once the script is exhausted.
    pub fn set_fallback(&self, outcome: MockConnect) {
        *self.fallback.lock().unwrap() = outcome;
    }

    /// Number of connect calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// URLs passed to every connect call.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    /// Wait for the next accepted connection.
    pub async fn next_peer(&self) -> Option<MockPeer> {
        self.peers_rx.lock().await.recv().await
    }

    fn next_outcome(&self) -> MockConnect {
        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }
        self.fallback.lock().unwrap().clone()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Transport, WsError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());

        match self.next_outcome() {
            MockConnect::Accept => {
                let (out_tx, out_rx) = mpsc::channel(100);
                let (in_tx, in_rx) = mpsc::channel(100);
                let _ = self.peers_tx.send(MockPeer {
                    to_client: in_tx,
                    from_client: out_rx,
                });
                Ok(Transport {
                    outgoing: out_tx,
                    incoming: in_rx,
                })
            }
            MockConnect::Refuse(reason) => Err(WsError::ConnectionFailed(reason)),
        }
    }
}
