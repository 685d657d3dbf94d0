//! Event-stream decoding logic
//!
//! Contains the stateful [`EventStreamDecoder`] that reassembles records from
//! arbitrarily fragmented chunks, as well as the line and payload parsing
//! functions it is built from.

use crate::sse::events::{SseLine, SseParseError, StreamEvent, DONE_SENTINEL};
use crate::sse::payloads::ChatCompletionChunk;

/// Longest payload excerpt kept in an [`SseParseError::InvalidJson`]
const MAX_PAYLOAD_EXCERPT: usize = 200;

/// Parse a single line of an event-stream record
pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim());
    }

    match line.split_once(':') {
        Some((name, value)) => SseLine::Field {
            name,
            value: value.trim(),
        },
        None => SseLine::Field {
            name: line,
            value: "",
        },
    }
}

/// Decode one trimmed `data:` payload into a typed event
pub fn parse_payload(payload: &str) -> Result<StreamEvent, SseParseError> {
    if payload == DONE_SENTINEL {
        return Ok(StreamEvent::Done);
    }

    serde_json::from_str::<ChatCompletionChunk>(payload)
        .map(StreamEvent::Chunk)
        .map_err(|e| SseParseError::InvalidJson {
            payload: excerpt(payload),
            message: e.to_string(),
        })
}

fn excerpt(payload: &str) -> String {
    match payload.char_indices().nth(MAX_PAYLOAD_EXCERPT) {
        Some((cut, _)) => format!("{}...", &payload[..cut]),
        None => payload.to_string(),
    }
}

/// Locate the first record separator (`\n\n` or `\r\n\r\n`).
///
/// Returns the record length and the separator length.
fn find_record_end(buf: &[u8]) -> Option<(usize, usize)> {
    buf.iter().enumerate().find_map(|(i, &byte)| {
        if byte != b'\n' && byte != b'\r' {
            return None;
        }
        let rest = &buf[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

/// Stateful decoder for a `text/event-stream` body.
///
/// Every call to [`feed`](Self::feed) consumes the whole chunk. Complete
/// records are decoded immediately; the unterminated tail is carried to the
/// next call. Only one partial record is ever buffered.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    /// Bytes of the record currently being received
    carry: Vec<u8>,
    /// Offset in `carry` below which no separator can start
    scanned: usize,
}

impl EventStreamDecoder {
    /// Create a decoder with an empty carry
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a raw chunk, returning every event it completes in arrival order.
    ///
    /// A bad payload produces an `Err` entry for that event only; later
    /// records in the same or following chunks still decode.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, SseParseError>> {
        self.carry.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        let mut from = self.scanned;
        while let Some((at, separator)) = find_record_end(&self.carry[from..]) {
            let end = from + at;
            decode_record(&self.carry[consumed..end], &mut events);
            consumed = end + separator;
            from = consumed;
        }
        self.carry.drain(..consumed);
        // A separator is at most 4 bytes, so its first 3 may already be here
        self.scanned = self.carry.len().saturating_sub(3);

        events
    }

    /// Number of bytes held for the unterminated record
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Drop any partially received record
    pub fn reset(&mut self) {
        self.carry.clear();
        self.scanned = 0;
    }
}

fn decode_record(record: &[u8], events: &mut Vec<Result<StreamEvent, SseParseError>>) {
    let text = match std::str::from_utf8(record) {
        Ok(text) => text,
        Err(e) => {
            events.push(Err(SseParseError::InvalidUtf8 {
                message: e.to_string(),
            }));
            return;
        }
    };

    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');
        match parse_sse_line(line) {
            SseLine::Data(payload) if !payload.is_empty() => events.push(parse_payload(payload)),
            _ => {}
        }
    }
}
