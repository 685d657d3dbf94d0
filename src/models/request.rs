use serde::{Deserialize, Serialize};

use super::message::Message;

/// Inbound envelope sent by a client over the WebSocket.
///
/// Wire format: `{ "conversationId": string, "messages": [{role, content}, ...] }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientRequest {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

impl ClientRequest {
    pub fn new(conversation_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages,
        }
    }
}

/// Reasoning switch sent to the upstream API. The relay always disables it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThinkingConfig {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ThinkingConfig {
    pub fn disabled() -> Self {
        Self { kind: "disabled" }
    }
}

/// Body of the upstream streaming completion request
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub stream: bool,
    pub thinking: ThinkingConfig,
    pub messages: &'a [Message],
}

impl<'a> ChatCompletionRequest<'a> {
    /// Build a streaming request with reasoning disabled
    pub fn streaming(model: &'a str, messages: &'a [Message]) -> Self {
        Self {
            model,
            stream: true,
            thinking: ThinkingConfig::disabled(),
            messages,
        }
    }
}
