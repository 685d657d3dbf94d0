//! Common test utilities for integration tests.
//!
//! This module provides reusable fixtures for driving a relay session or a
//! full relay server in tests.
//!
//! # Example
//!
//! ```ignore
//! use common::{delta, done, TestRelay};
//!
//! let relay = TestRelay::new();
//! relay.http.set_default_response(MockResponse::chunks([delta("Hi"), done()]));
//! ```

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;
use std::time::Duration;

use chatrelay::relay::{RelaySession, UpstreamClient};
use chatrelay::store::ConversationStore;

/// Upstream URL used by every mock-backed session
pub const UPSTREAM_URL: &str = "https://upstream.test/api/v3/chat/completions";

/// One event-stream record carrying a content delta.
pub fn delta(text: &str) -> String {
    let chunk = serde_json::json!({
        "id": "chunk-1",
        "model": "model-x",
        "choices": [{ "index": 0, "delta": { "role": "assistant", "content": text } }]
    });
    format!("data: {}\n\n", chunk)
}

/// The end-of-stream record.
pub fn done() -> String {
    "data: [DONE]\n\n".to_string()
}

/// A whole event-stream body with one delta per fragment, then `[DONE]`.
pub fn stream_body(fragments: &[&str]) -> String {
    let mut body: String = fragments.iter().map(|f| delta(f)).collect();
    body.push_str(&done());
    body
}

/// A relay session over a mock upstream, with handles to both.
pub struct TestRelay {
    pub http: MockHttpClient,
    pub store: ConversationStore,
    pub session: RelaySession,
}

impl TestRelay {
    pub fn new() -> Self {
        Self::with_idle_timeout(None)
    }

    pub fn with_idle_timeout(idle_timeout: Option<Duration>) -> Self {
        let http = MockHttpClient::new();
        let store = ConversationStore::new();
        let upstream = UpstreamClient::new(Arc::new(http.clone()), UPSTREAM_URL, "test-key", "model-x");
        let session = RelaySession::new(store.clone(), upstream).with_idle_timeout(idle_timeout);
        Self {
            http,
            store,
            session,
        }
    }
}

/// Client request envelope as JSON text.
pub fn request_json(conversation_id: &str, messages: &[(&str, &str)]) -> String {
    let messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|(role, content)| serde_json::json!({ "role": role, "content": content }))
        .collect();
    serde_json::json!({ "conversationId": conversation_id, "messages": messages }).to_string()
}
