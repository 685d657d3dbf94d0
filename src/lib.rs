//! chatrelay - WebSocket relay for a streaming chat-completion API
//!
//! Clients send conversation turns over a WebSocket; the relay merges them
//! with stored history, streams the upstream reply back fragment by
//! fragment, and commits the finished exchange.
//!
//! This library exposes modules for use in integration tests and for
//! embedding the relay or its client.

pub mod adapters;
pub mod client;
pub mod config;
pub mod models;
pub mod relay;
pub mod server;
pub mod sse;
pub mod store;
pub mod traits;
