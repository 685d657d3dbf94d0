//! Connection state and reconnect policy.

use std::time::Duration;

/// Reconnect attempts made after a connection is lost
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Fixed wait before each reconnect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Where a client connection is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    /// Whether a connection is established or being established
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Configuration for a [`ConnectionLifecycle`](super::ConnectionLifecycle).
///
/// Reconnection is a fixed-delay policy: after a connection is lost or an
/// attempt fails, wait `reconnect_delay` and try again, at most
/// `max_reconnect_attempts` times in a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Relay WebSocket URL
    pub url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl LifecycleConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LifecycleConfig::new("ws://localhost:10087");
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builders() {
        let config = LifecycleConfig::new("ws://relay")
            .with_max_reconnect_attempts(5)
            .with_reconnect_delay(Duration::from_millis(10));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_state_is_active() {
        assert!(ConnectionState::Open.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(!ConnectionState::Closing.is_active());
        assert!(!ConnectionState::Disconnected.is_active());
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Open.to_string(), "open");
    }
}
