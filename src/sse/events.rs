//! Decoded event-stream records and decode errors.

use super::payloads::ChatCompletionChunk;

/// Payload that marks normal end of an upstream stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A single decoded `data:` payload from the upstream stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A JSON completion chunk
    Chunk(ChatCompletionChunk),
    /// The `[DONE]` sentinel
    Done,
}

impl StreamEvent {
    /// Incremental text carried by this event, if any
    pub fn content(&self) -> Option<&str> {
        match self {
            StreamEvent::Chunk(chunk) => chunk.content(),
            StreamEvent::Done => None,
        }
    }
}

/// Represents a parsed line inside one event-stream record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Data payload with the `data:` prefix stripped and whitespace trimmed
    Data(&'a str),
    /// Any other field (`event:`, `id:`, `retry:`, ...)
    Field { name: &'a str, value: &'a str },
    /// Comment line (starts with ':')
    Comment(&'a str),
    /// Blank line
    Empty,
}

/// Failure to decode a single record. Never fatal to the decoder.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SseParseError {
    /// The record bytes were not valid UTF-8
    #[error("event record is not valid UTF-8: {message}")]
    InvalidUtf8 { message: String },
    /// A data payload was neither `[DONE]` nor a completion chunk
    #[error("invalid JSON in event payload '{payload}': {message}")]
    InvalidJson { payload: String, message: String },
}
