//! HTTP client trait abstraction.
//!
//! Provides a trait-based abstraction for the upstream streaming request,
//! enabling dependency injection and mocking in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// Response body delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Server returned a non-success status
    ServerError { status: u16, message: String },
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for the outbound HTTP client used to reach the upstream API.
///
/// Implementations include the production reqwest-based client and a
/// scripted mock for testing.
///
/// # Example
///
/// ```ignore
/// use chatrelay::traits::{Headers, HttpClient};
///
/// async fn open<C: HttpClient>(client: &C, body: &str) {
///     let mut stream = client.post_stream("https://api.example.com/chat", body, &Headers::new()).await?;
///     while let Some(chunk) = stream.next().await {
///         // feed chunk into a decoder
///     }
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `body` and return the response body as a byte stream.
    ///
    /// A non-2xx status is reported as [`HttpError::ServerError`] before any
    /// body is streamed.
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError>;
}
