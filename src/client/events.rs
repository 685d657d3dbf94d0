//! Typed event channels for a client connection.
//!
//! Every listener owns its own broadcast receiver, so a slow or failing
//! listener never blocks delivery to the others.

use tokio::sync::broadcast;

use crate::relay::OutboundFrame;

const EVENT_CAPACITY: usize = 256;

/// Errors surfaced on the error channel
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LifecycleError {
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    #[error("connection lost: {0}")]
    Transport(String),
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("giving up after {attempts} reconnect attempts")]
    ReconnectExhausted { attempts: u32 },
}

/// Senders for the four event kinds
#[derive(Debug)]
pub(crate) struct LifecycleEvents {
    open: broadcast::Sender<()>,
    message: broadcast::Sender<OutboundFrame>,
    close: broadcast::Sender<()>,
    error: broadcast::Sender<LifecycleError>,
}

impl LifecycleEvents {
    pub(crate) fn new() -> Self {
        Self {
            open: broadcast::channel(EVENT_CAPACITY).0,
            message: broadcast::channel(EVENT_CAPACITY).0,
            close: broadcast::channel(EVENT_CAPACITY).0,
            error: broadcast::channel(EVENT_CAPACITY).0,
        }
    }

    // Send errors only mean nobody is listening.

    pub(crate) fn emit_open(&self) {
        let _ = self.open.send(());
    }

    pub(crate) fn emit_message(&self, frame: OutboundFrame) {
        let _ = self.message.send(frame);
    }

    pub(crate) fn emit_close(&self) {
        let _ = self.close.send(());
    }

    pub(crate) fn emit_error(&self, err: LifecycleError) {
        let _ = self.error.send(err);
    }

    pub(crate) fn subscribe_open(&self) -> broadcast::Receiver<()> {
        self.open.subscribe()
    }

    pub(crate) fn subscribe_message(&self) -> broadcast::Receiver<OutboundFrame> {
        self.message.subscribe()
    }

    pub(crate) fn subscribe_close(&self) -> broadcast::Receiver<()> {
        self.close.subscribe()
    }

    pub(crate) fn subscribe_error(&self) -> broadcast::Receiver<LifecycleError> {
        self.error.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_gets_every_event() {
        let events = LifecycleEvents::new();
        let mut first = events.subscribe_message();
        let mut second = events.subscribe_message();

        events.emit_message(OutboundFrame::content("He"));
        events.emit_message(OutboundFrame::Done);

        assert_eq!(first.try_recv().unwrap(), OutboundFrame::content("He"));
        assert_eq!(first.try_recv().unwrap(), OutboundFrame::Done);
        assert_eq!(second.try_recv().unwrap(), OutboundFrame::content("He"));
    }

    #[test]
    fn test_dropped_subscriber_does_not_affect_others() {
        let events = LifecycleEvents::new();
        let dropped = events.subscribe_error();
        let mut kept = events.subscribe_error();
        drop(dropped);

        events.emit_error(LifecycleError::NotConnected);
        assert_eq!(kept.try_recv().unwrap(), LifecycleError::NotConnected);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let events = LifecycleEvents::new();
        events.emit_open();
        events.emit_close();
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            LifecycleError::ReconnectExhausted { attempts: 3 }.to_string(),
            "giving up after 3 reconnect attempts"
        );
    }
}
