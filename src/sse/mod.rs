//! Event-stream (SSE) decoding for upstream completion responses.
//!
//! The upstream body is a sequence of records separated by a blank line:
//! - `data: <json>` - a completion chunk
//! - `data: [DONE]` - end of stream
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `events` - Decoded event types (StreamEvent, SseLine, SseParseError)
//! - `payloads` - Completion chunk deserialization structs
//! - `parser` - Decoding logic (EventStreamDecoder, parse_sse_line, parse_payload)

mod events;
mod parser;
mod payloads;

pub use events::{SseLine, SseParseError, StreamEvent, DONE_SENTINEL};
pub use parser::{parse_payload, parse_sse_line, EventStreamDecoder};
pub use payloads::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
