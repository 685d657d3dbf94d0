//! Concrete implementations of trait abstractions.
//!
//! This module provides the production adapters behind the traits defined in
//! `crate::traits`, enabling dependency injection and testability.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - Upstream HTTP client using reqwest
//! - [`WsFrameSink`] - Frame sink over an axum server-side WebSocket
//! - [`TungsteniteConnector`] - Client-side WebSocket using tokio-tungstenite
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles for all adapters:
//! - [`mock::MockHttpClient`] - Scripted upstream responses
//! - [`mock::RecordingSink`] - Captured outbound frames
//! - [`mock::MockConnector`] - Scripted connect outcomes with peer handles

pub mod axum_sink;
pub mod mock;
pub mod reqwest_http;
pub mod tungstenite_ws;

pub use axum_sink::{WsFrameSink, WsWriter};
pub use mock::{MockConnector, MockHttpClient, RecordingSink};
pub use reqwest_http::ReqwestHttpClient;
pub use tungstenite_ws::TungsteniteConnector;
