//! Text frames exchanged with WebSocket clients.

use crate::sse::DONE_SENTINEL;

/// Prefix that marks an error frame
pub const ERROR_MARKER: &str = "[ERROR] ";

/// One text frame sent from the relay to a client.
///
/// On the wire a frame is plain text: the raw content fragment, the literal
/// `[DONE]`, or an error message starting with [`ERROR_MARKER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Incremental reply text, forwarded as received
    Content(String),
    /// The exchange finished
    Done,
    /// The exchange (or the request) failed
    Error(String),
}

impl OutboundFrame {
    pub fn content(text: impl Into<String>) -> Self {
        OutboundFrame::Content(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutboundFrame::Error(message.into())
    }

    /// Render the frame as WebSocket text
    pub fn to_text(&self) -> String {
        match self {
            OutboundFrame::Content(text) => text.clone(),
            OutboundFrame::Done => DONE_SENTINEL.to_string(),
            OutboundFrame::Error(message) => format!("{}{}", ERROR_MARKER, message),
        }
    }

    /// Interpret a received text frame.
    ///
    /// Anything that is neither `[DONE]` nor marked as an error is content.
    pub fn parse(text: &str) -> Self {
        if text == DONE_SENTINEL {
            OutboundFrame::Done
        } else if let Some(message) = text.strip_prefix(ERROR_MARKER) {
            OutboundFrame::Error(message.to_string())
        } else {
            OutboundFrame::Content(text.to_string())
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, OutboundFrame::Done)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OutboundFrame::Error(_))
    }
}

impl std::fmt::Display for OutboundFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}
