//! Payload deserialization structs for upstream completion chunks.
//!
//! Only the fields the relay reads are required; everything else is
//! optional so that provider-specific extras never fail a record.

use serde::Deserialize;

/// One `data:` JSON record of a streaming chat completion
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Non-empty `choices[0].delta.content`, if present
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_from_first_choice() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"x","model":"m","created":1,"object":"chat.completion.chunk",
                "choices":[{"delta":{"role":"assistant","content":"He"},"index":0}],
                "usage":null,"service_tier":"default"}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), Some("He"));
        assert_eq!(chunk.choices[0].delta.role.as_deref(), Some("assistant"));
    }

    #[test]
    fn test_empty_or_missing_content_is_none() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""},"index":0}]}"#).unwrap();
        assert_eq!(chunk.content(), None);

        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"index":0,"finish_reason":"stop"}]}"#)
                .unwrap();
        assert_eq!(chunk.content(), None);
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));

        let chunk: ChatCompletionChunk = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(chunk.content(), None);
    }
}
