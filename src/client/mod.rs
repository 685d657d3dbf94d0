//! Client side of the relay protocol.
//!
//! # Module structure
//! - `state` - ConnectionState and the reconnect policy (LifecycleConfig)
//! - `events` - Typed event channels and LifecycleError
//! - `lifecycle` - ConnectionLifecycle state machine

mod events;
mod lifecycle;
mod state;

pub use events::LifecycleError;
pub use lifecycle::ConnectionLifecycle;
pub use state::{
    ConnectionState, LifecycleConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY,
};
