//! Client for the upstream streaming completion API.

use std::sync::Arc;

use tracing::debug;

use crate::config::RelayConfig;
use crate::models::{ChatCompletionRequest, Message};
use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

/// Issues streaming completion requests on behalf of relay sessions.
///
/// Holds the fixed request parameters; the message list is the only thing
/// that varies per exchange.
#[derive(Clone)]
pub struct UpstreamClient {
    http: Arc<dyn HttpClient>,
    url: String,
    api_key: String,
    model: String,
}

impl UpstreamClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &RelayConfig, http: Arc<dyn HttpClient>) -> Self {
        Self::new(
            http,
            config.api_url.clone(),
            config.api_key.clone(),
            config.model_id.clone(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Headers sent with every upstream request
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers
    }

    /// JSON body for a streaming request over `messages`
    pub fn request_body(&self, messages: &[Message]) -> Result<String, HttpError> {
        let request = ChatCompletionRequest::streaming(&self.model, messages);
        serde_json::to_string(&request)
            .map_err(|e| HttpError::Other(format!("failed to encode request: {}", e)))
    }

    /// Open the upstream event stream for `messages`
    pub async fn open_stream(&self, messages: &[Message]) -> Result<ByteStream, HttpError> {
        let body = self.request_body(messages)?;
        debug!(
            "Opening upstream stream to {} with {} messages",
            self.url,
            messages.len()
        );
        self.http.post_stream(&self.url, &body, &self.headers()).await
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
