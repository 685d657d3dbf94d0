//! Relay configuration.
//!
//! Values come from the process environment, with a `.env` file in the
//! working directory loaded first when present.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Default WebSocket listen port
pub const DEFAULT_PORT: u16 = 10087;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Configuration errors, reported before the server starts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Configuration for the relay server.
///
/// Use the builder methods to override defaults in code.
///
/// # Example
///
/// ```ignore
/// use chatrelay::config::RelayConfig;
///
/// let config = RelayConfig::new("https://api.example.com/chat", "key", "model-x")
///     .with_port(0)
///     .with_idle_timeout(Some(std::time::Duration::from_secs(60)));
/// ```
#[derive(Clone)]
pub struct RelayConfig {
    /// Upstream streaming completion endpoint (`API_URL`)
    pub api_url: String,
    /// Bearer token for the upstream (`ARK_API_KEY`)
    pub api_key: String,
    /// Model identifier sent with every request (`MODEL_ID`)
    pub model_id: String,
    /// Listen port (`PORT`, default 10087)
    pub port: u16,
    /// Listen address (`BIND_ADDR`, default 0.0.0.0)
    pub bind_addr: String,
    /// Longest allowed gap between upstream chunks (`UPSTREAM_IDLE_TIMEOUT_SECS`)
    pub idle_timeout: Option<Duration>,
}

impl RelayConfig {
    /// Create a config with the required upstream settings and defaults for the rest.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model_id: model_id.into(),
            port: DEFAULT_PORT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            idle_timeout: None,
        }
    }

    /// Load from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Failed to load .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut config = Self::new(
            required("API_URL")?,
            required("ARK_API_KEY")?,
            required("MODEL_ID")?,
        );

        if let Some(port) = get("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: port.clone(),
            })?;
        }

        if let Some(bind_addr) = get("BIND_ADDR") {
            config.bind_addr = bind_addr.trim().to_string();
        }

        if let Some(secs) = get("UPSTREAM_IDLE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "UPSTREAM_IDLE_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set the listen port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the listen address.
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    /// Set or clear the upstream idle timeout.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Socket address the server binds to
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: self.bind_addr.clone(),
            })
    }
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
