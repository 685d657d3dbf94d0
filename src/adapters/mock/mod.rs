//! Mock implementations for testing.
//!
//! This module provides mock implementations of all trait abstractions,
//! enabling unit and integration testing without network access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - Upstream client with scripted event-stream bodies
//! - [`RecordingSink`] - Frame sink that captures what a client would receive
//! - [`MockConnector`] - WebSocket connector with scripted connect outcomes

pub mod http;
pub mod sink;
pub mod websocket;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use sink::RecordingSink;
pub use websocket::{MockConnect, MockConnector, MockPeer};
