//! Mock implementations for test fixtures.
//!
//! This module re-exports the mock implementations from
//! `chatrelay::adapters::mock` and adds helpers for waiting on events.

pub use chatrelay::adapters::mock::{
    MockConnect, MockConnector, MockHttpClient, MockPeer, MockResponse, RecordingSink,
};

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(5);

/// Receive the next event, failing the test if none arrives in time.
pub async fn next_event<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Receive events until `pred` matches, returning everything seen.
pub async fn events_until<T: Clone>(
    rx: &mut broadcast::Receiver<T>,
    pred: impl Fn(&T) -> bool,
) -> Vec<T> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let stop = pred(&event);
        seen.push(event);
        if stop {
            return seen;
        }
    }
}

/// Wait for the next accepted mock connection.
pub async fn next_peer(connector: &MockConnector) -> MockPeer {
    timeout(WAIT, connector.next_peer())
        .await
        .expect("timed out waiting for connection")
        .expect("connector dropped")
}
