//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - Upstream streaming POST
//! - [`FrameSink`] - Delivery of outbound frames to one client
//! - [`Connector`] - Client-side WebSocket connection factory

pub mod http;
pub mod sink;
pub mod websocket;

pub use http::{ByteStream, Headers, HttpClient, HttpError};
pub use sink::{FrameSink, SinkError};
pub use websocket::{Connector, Transport, TransportEvent, WsError};
