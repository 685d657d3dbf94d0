//! Wire and domain data types shared by the relay and the client.

mod message;
mod request;

pub use message::{Message, Role};
pub use request::{ChatCompletionRequest, ClientRequest, ThinkingConfig};
