//! Recording frame sink for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::relay::OutboundFrame;
use crate::traits::{FrameSink, SinkError};

/// Frame sink that captures every delivered frame.
///
/// Optionally starts failing after a fixed number of frames, to simulate a
/// client that disconnects mid-stream.
///
/// # Example
///
/// ```ignore
/// use chatrelay::adapters::mock::RecordingSink;
///
/// let sink = RecordingSink::new();
/// session.handle("c1", vec![Message::user("hi")], &sink).await?;
/// assert_eq!(sink.frames().last(), Some(&OutboundFrame::Done));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<OutboundFrame>>>,
    /// Frames accepted before every send fails
    capacity: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `count` frames, then report the client as gone.
    pub fn fail_after(mut self, count: usize) -> Self {
        self.capacity = Some(count);
        self
    }

    /// Frames delivered so far, in order.
    pub fn frames(&self) -> Vec<OutboundFrame> {
        self.frames.lock().unwrap().clone()
    }

    /// Delivered frames rendered as wire text.
    pub fn texts(&self) -> Vec<String> {
        self.frames().iter().map(OutboundFrame::to_text).collect()
    }

    /// Concatenated content frames.
    pub fn content(&self) -> String {
        self.frames()
            .iter()
            .filter_map(|frame| match frame {
                OutboundFrame::Content(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .concat()
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_frame(&self, frame: OutboundFrame) -> Result<(), SinkError> {
        let mut frames = self.frames.lock().unwrap();
        if self.capacity.is_some_and(|capacity| frames.len() >= capacity) {
            return Err(SinkError::Closed);
        }
        frames.push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let sink = RecordingSink::new();
        sink.send_frame(OutboundFrame::content("a")).await.unwrap();
        sink.send_frame(OutboundFrame::Done).await.unwrap();

        assert_eq!(sink.texts(), vec!["a", "[DONE]"]);
        assert_eq!(sink.content(), "a");
    }

    #[tokio::test]
    async fn test_fail_after() {
        let sink = RecordingSink::new().fail_after(1);
        assert!(sink.send_frame(OutboundFrame::content("a")).await.is_ok());
        assert_eq!(
            sink.send_frame(OutboundFrame::content("b")).await,
            Err(SinkError::Closed)
        );
        assert_eq!(sink.frames().len(), 1);
    }
}
