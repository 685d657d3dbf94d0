//! Reqwest-based HTTP client adapter.
//!
//! This module provides the production upstream client using reqwest,
//! implementing the [`HttpClient`] trait from `crate::traits`.

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

/// Longest upstream error body kept in [`HttpError::ServerError`]
const MAX_ERROR_BODY: usize = 512;

/// HTTP client implementation using reqwest.
///
/// # Example
///
/// ```ignore
/// use chatrelay::adapters::ReqwestHttpClient;
/// use chatrelay::traits::{Headers, HttpClient};
///
/// let client = ReqwestHttpClient::new();
/// let stream = client.post_stream("https://api.example.com/chat", "{}", &Headers::new()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    ///
    /// This allows for advanced configuration like connect timeouts,
    /// connection pools, or TLS settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Convert reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Apply headers to a request builder.
    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let builder = self.client.post(url).body(body.to_string());
        let builder = Self::apply_headers(builder, headers);

        let response = builder.send().await.map_err(Self::convert_error)?;

        let status = response.status();
        debug!("Upstream responded with status {}", status);
        if !status.is_success() {
            return Err(HttpError::ServerError {
                status: status.as_u16(),
                message: error_excerpt(response).await,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(Self::convert_error));

        Ok(Box::pin(stream))
    }
}

/// Read at most [`MAX_ERROR_BODY`] bytes of an error response body.
async fn error_excerpt(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut truncated = false;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else {
            break;
        };
        let room = MAX_ERROR_BODY - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        body.extend_from_slice(&chunk);
    }

    let text = String::from_utf8_lossy(&body);
    if truncated {
        format!("{}...", text.trim_end_matches('\u{fffd}'))
    } else {
        text.into_owned()
    }
}
