//! Relaying client requests to the upstream completion API.
//!
//! # Module structure
//! - `frame` - Text frames sent to clients (content, `[DONE]`, errors)
//! - `error` - Per-exchange error taxonomy
//! - `upstream` - Streaming request to the upstream API
//! - `session` - RelaySession: validate, merge history, stream, commit

mod error;
mod frame;
mod session;
mod upstream;

pub use error::{RelayError, StreamError};
pub use frame::{OutboundFrame, ERROR_MARKER};
pub use session::{ExchangeState, ExchangeSummary, RelaySession};
pub use upstream::UpstreamClient;
