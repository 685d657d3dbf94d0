//! Axum WebSocket frame sink.
//!
//! Adapts the write half of a server-side WebSocket to [`FrameSink`], so
//! concurrent exchanges on one connection can share it.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{Sink, SinkExt};
use tokio::sync::Mutex;

use crate::relay::OutboundFrame;
use crate::traits::{FrameSink, SinkError};

/// Write half of an axum WebSocket
pub type WsWriter = SplitSink<WebSocket, Message>;

/// Shared sink for one client connection.
///
/// Each frame is written under the lock, so frames from overlapping
/// exchanges never interleave.
pub struct WsFrameSink<S = WsWriter> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for WsFrameSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> WsFrameSink<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    pub fn new(writer: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl<S> FrameSink for WsFrameSink<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: Display,
{
    async fn send_frame(&self, frame: OutboundFrame) -> Result<(), SinkError> {
        let mut writer = self.inner.lock().await;
        writer
            .send(Message::Text(frame.to_text()))
            .await
            .map_err(|e| SinkError::SendFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_frames_written_as_text() {
        let (tx, mut rx) = mpsc::unbounded::<Message>();
        let sink = WsFrameSink::new(tx);

        sink.send_frame(OutboundFrame::content("He")).await.unwrap();
        sink.send_frame(OutboundFrame::Done).await.unwrap();

        assert!(matches!(rx.next().await, Some(Message::Text(t)) if t == "He"));
        assert!(matches!(rx.next().await, Some(Message::Text(t)) if t == "[DONE]"));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded::<Message>();
        let sink = WsFrameSink::new(tx);
        drop(rx);

        let result = sink.send_frame(OutboundFrame::content("x")).await;
        assert!(matches!(result, Err(SinkError::SendFailed(_))));
    }
}
