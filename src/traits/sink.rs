//! Outbound frame sink abstraction.
//!
//! A relay session never touches the client socket directly; it pushes
//! [`OutboundFrame`]s into a [`FrameSink`].

use async_trait::async_trait;

use crate::relay::OutboundFrame;

/// Errors returned when a frame cannot be delivered to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    /// The client connection is gone
    Closed,
    /// The transport rejected the frame
    SendFailed(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Closed => write!(f, "Client connection closed"),
            SinkError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
        }
    }
}

impl std::error::Error for SinkError {}

/// Destination for frames addressed to one client.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Deliver one frame. Frames are delivered in call order.
    async fn send_frame(&self, frame: OutboundFrame) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_display() {
        assert_eq!(SinkError::Closed.to_string(), "Client connection closed");
        assert_eq!(
            SinkError::SendFailed("broken pipe".to_string()).to_string(),
            "Send failed: broken pipe"
        );
    }
}
