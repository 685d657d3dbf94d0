//! Client connection state machine with bounded reconnection.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{ClientRequest, Message};
use crate::relay::OutboundFrame;
use crate::traits::{Connector, TransportEvent};

use super::events::{LifecycleError, LifecycleEvents};
use super::state::{ConnectionState, LifecycleConfig};

/// A client connection to the relay.
///
/// `Disconnected -> Connecting -> Open`, back to `Disconnected` when the
/// connection drops or an attempt fails, with up to
/// `max_reconnect_attempts` automatic retries spaced by `reconnect_delay`.
/// Reconnects run on a background task and never block the caller.
///
/// # Example
///
/// ```ignore
/// use chatrelay::adapters::TungsteniteConnector;
/// use chatrelay::client::{ConnectionLifecycle, LifecycleConfig};
///
/// let client = ConnectionLifecycle::new(
///     Arc::new(TungsteniteConnector::new()),
///     LifecycleConfig::new("ws://127.0.0.1:10087"),
/// );
/// let mut frames = client.on_message();
/// client.connect().await?;
/// client.send_text("hi").await?;
/// while let Ok(frame) = frames.recv().await {
///     if frame.is_done() { break; }
/// }
/// client.close();
/// ```
pub struct ConnectionLifecycle {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    config: LifecycleConfig,
    state_tx: watch::Sender<ConnectionState>,
    /// Consecutive automatic reconnect attempts
    attempts: AtomicU32,
    /// Bumped by every connect() and close(); stale tasks compare against it
    generation: AtomicU64,
    outgoing: Mutex<Option<mpsc::Sender<String>>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    conversation_id: OnceLock<String>,
    events: LifecycleEvents,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionLifecycle {
    pub fn new(connector: Arc<dyn Connector>, config: LifecycleConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                state_tx,
                attempts: AtomicU32::new(0),
                generation: AtomicU64::new(0),
                outgoing: Mutex::new(None),
                driver: Mutex::new(None),
                conversation_id: OnceLock::new(),
                events: LifecycleEvents::new(),
            }),
        }
    }

    /// Resume an existing conversation instead of starting a new one.
    pub fn with_conversation_id(self, id: impl Into<String>) -> Self {
        if self.shared.conversation_id.set(id.into()).is_err() {
            warn!("Conversation id already assigned, keeping the existing one");
        }
        self
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.shared.config
    }

    /// Conversation id, once assigned by the first send.
    pub fn conversation_id(&self) -> Option<&str> {
        self.shared.conversation_id.get().map(String::as_str)
    }

    /// Automatic reconnect attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn on_open(&self) -> broadcast::Receiver<()> {
        self.shared.events.subscribe_open()
    }

    /// Frames received from the relay.
    pub fn on_message(&self) -> broadcast::Receiver<OutboundFrame> {
        self.shared.events.subscribe_message()
    }

    pub fn on_close(&self) -> broadcast::Receiver<()> {
        self.shared.events.subscribe_close()
    }

    pub fn on_error(&self) -> broadcast::Receiver<LifecycleError> {
        self.shared.events.subscribe_error()
    }

    /// Open the connection.
    ///
    /// Starts a fresh reconnect cycle. If this attempt fails, the error is
    /// returned and automatic reconnection still proceeds in the background.
    ///
    /// While already connecting or open this returns `Ok(())` at once without
    /// waiting; `Ok` then does not mean the in-flight attempt succeeded.
    /// Watch [`subscribe_state`](Self::subscribe_state) or
    /// [`on_open`](Self::on_open) for the outcome.
    pub async fn connect(&self) -> Result<(), LifecycleError> {
        let state = self.state();
        if state.is_active() {
            warn!("connect() called while {}, ignoring", state);
            return Ok(());
        }

        let shared = &self.shared;
        shared.cancel_driver();
        shared.attempts.store(0, Ordering::SeqCst);
        let generation = shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (incoming, result) = match shared.open_transport(generation).await {
            Ok(incoming) => (Some(incoming), Ok(())),
            Err(e) => (None, Err(e)),
        };

        if shared.is_current(generation) {
            let driver = tokio::spawn(drive(Arc::clone(shared), generation, incoming));
            if let Some(previous) = lock(&shared.driver).replace(driver) {
                previous.abort();
            }
        }
        result
    }

    /// Send one user message with the given text.
    pub async fn send_text(&self, text: &str) -> Result<(), LifecycleError> {
        self.send_messages(vec![Message::user(text)]).await
    }

    /// Send one message.
    pub async fn send_message(&self, message: Message) -> Result<(), LifecycleError> {
        self.send_messages(vec![message]).await
    }

    /// Send a batch of messages as one exchange.
    ///
    /// Fails with [`LifecycleError::NotConnected`] (also reported on the
    /// error channel) unless the connection is open.
    pub async fn send_messages(&self, messages: Vec<Message>) -> Result<(), LifecycleError> {
        let outgoing = if self.state() == ConnectionState::Open {
            lock(&self.shared.outgoing).clone()
        } else {
            None
        };
        let Some(outgoing) = outgoing else {
            return Err(self.shared.fail(LifecycleError::NotConnected));
        };

        let conversation_id = self
            .shared
            .conversation_id
            .get_or_init(|| Uuid::new_v4().to_string());
        let request = ClientRequest::new(conversation_id.clone(), messages);
        let text = serde_json::to_string(&request)
            .map_err(|e| self.shared.fail(LifecycleError::Encode(e.to_string())))?;

        debug!("Sending request for {}", conversation_id);
        outgoing
            .send(text)
            .await
            .map_err(|_| self.shared.fail(LifecycleError::SendFailed("connection closed".to_string())))
    }

    /// Close the connection and stop any pending reconnect.
    ///
    /// Idempotent; `close` is emitted only if a connection was open or
    /// being opened.
    pub fn close(&self) {
        let shared = &self.shared;
        let previous = self.state();
        if previous.is_active() {
            shared.set_state(ConnectionState::Closing);
        }

        shared.generation.fetch_add(1, Ordering::SeqCst);
        shared.cancel_driver();
        lock(&shared.outgoing).take();
        shared.set_state(ConnectionState::Disconnected);

        if previous.is_active() {
            info!("Connection to {} closed", shared.config.url);
            shared.events.emit_close();
        }
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.cancel_driver();
        lock(&self.shared.outgoing).take();
    }
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state {} -> {}", previous, state);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn cancel_driver(&self) {
        if let Some(driver) = lock(&self.driver).take() {
            driver.abort();
        }
    }

    /// Report an error on the error channel and hand it back
    fn fail(&self, err: LifecycleError) -> LifecycleError {
        self.events.emit_error(err.clone());
        err
    }

    /// One connect attempt: `Connecting`, then `Open` or `Disconnected`
    async fn open_transport(
        &self,
        generation: u64,
    ) -> Result<mpsc::Receiver<TransportEvent>, LifecycleError> {
        self.set_state(ConnectionState::Connecting);
        info!("Connecting to {}", self.config.url);

        let result = self.connector.connect(&self.config.url).await;
        if !self.is_current(generation) {
            debug!("Connect attempt superseded, discarding");
            return Err(LifecycleError::ConnectFailed("connection cancelled".to_string()));
        }

        match result {
            Ok(transport) => {
                *lock(&self.outgoing) = Some(transport.outgoing);
                self.attempts.store(0, Ordering::SeqCst);
                self.set_state(ConnectionState::Open);
                info!("Connected to {}", self.config.url);
                self.events.emit_open();
                Ok(transport.incoming)
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", self.config.url, e);
                self.set_state(ConnectionState::Disconnected);
                Err(self.fail(LifecycleError::ConnectFailed(e.to_string())))
            }
        }
    }

    /// Deliver events from an open transport until it ends
    async fn pump(&self, generation: u64, mut incoming: mpsc::Receiver<TransportEvent>) {
        let lost = loop {
            let event = incoming.recv().await;
            if !self.is_current(generation) {
                return;
            }
            match event {
                Some(TransportEvent::Text(text)) => {
                    self.events.emit_message(OutboundFrame::parse(&text));
                }
                Some(TransportEvent::Closed) | None => break None,
                Some(TransportEvent::Error(reason)) => break Some(reason),
            }
        };

        lock(&self.outgoing).take();
        self.set_state(ConnectionState::Disconnected);
        match lost {
            None => {
                info!("Connection to {} closed by server", self.config.url);
                self.events.emit_close();
            }
            Some(reason) => {
                warn!("Connection to {} lost: {}", self.config.url, reason);
                self.fail(LifecycleError::Transport(reason));
            }
        }
    }

    /// Claim the next reconnect attempt, or report that the budget is spent
    fn next_reconnect_attempt(&self) -> Option<u32> {
        let max = self.config.max_reconnect_attempts;
        let attempts = self.attempts.load(Ordering::SeqCst);
        if attempts < max {
            self.attempts.store(attempts + 1, Ordering::SeqCst);
            Some(attempts + 1)
        } else {
            error!("Failed to reconnect after {} attempts, giving up", attempts);
            self.fail(LifecycleError::ReconnectExhausted { attempts });
            None
        }
    }
}

/// Background task owning one connect cycle
async fn drive(
    shared: Arc<Shared>,
    generation: u64,
    mut incoming: Option<mpsc::Receiver<TransportEvent>>,
) {
    loop {
        if let Some(rx) = incoming.take() {
            shared.pump(generation, rx).await;
        }
        if !shared.is_current(generation) {
            return;
        }

        let Some(attempt) = shared.next_reconnect_attempt() else {
            return;
        };
        info!(
            "Reconnection attempt {} of {}, waiting {:?}",
            attempt, shared.config.max_reconnect_attempts, shared.config.reconnect_delay
        );
        tokio::time::sleep(shared.config.reconnect_delay).await;
        if !shared.is_current(generation) {
            return;
        }

        incoming = shared.open_transport(generation).await.ok();
    }
}
