//! Mock HTTP client for testing.
//!
//! Provides a configurable mock upstream that returns scripted event-stream
//! bodies or errors, and records every request it receives.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: String,
}

impl RecordedRequest {
    /// Parse the recorded body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream these chunks, then end
    Stream(Vec<Bytes>),
    /// Stream these chunks, then fail with the error
    StreamThenError(Vec<Bytes>, HttpError),
    /// Stream these chunks, then stay open forever
    StreamThenStall(Vec<Bytes>),
    /// Never send response headers
    Stall,
    /// Fail before any body is streamed
    Error(HttpError),
}

impl MockResponse {
    /// Stream a text body split into the given pieces
    pub fn chunks<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(
            pieces
                .into_iter()
                .map(|piece| Bytes::from(piece.into()))
                .collect(),
        )
    }
}

/// Mock HTTP client for testing.
///
/// Responses are chosen in this order: the next queued response, an exact or
/// prefix URL match, then the default.
///
/// # Example
///
/// ```ignore
/// use chatrelay::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.set_default_response(MockResponse::chunks(["data: [DONE]\n\n"]));
///
/// let stream = client.post_stream("https://api.example.com/chat", "{}", &Headers::new()).await?;
/// assert_eq!(client.get_requests().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    /// Configured responses by URL pattern
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// One-shot responses consumed in order
    queued: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            queued: Arc::new(Mutex::new(VecDeque::new())),
            default_response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set a response for a specific URL.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Queue a response for the next request only.
    pub fn push_response(&self, response: MockResponse) {
        self.queued.lock().unwrap().push_back(response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record_request(&self, url: &str, headers: &Headers, body: &str) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
            body: body.to_string(),
        });
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        if let Some(response) = self.queued.lock().unwrap().pop_front() {
            return Some(response);
        }

        let responses = self.responses.lock().unwrap();
        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }
        for (pattern, response) in responses.iter() {
            if url.starts_with(pattern) {
                return Some(response.clone());
            }
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        use futures::StreamExt;

        self.record_request(url, headers, body);

        match self.get_response(url) {
            Some(MockResponse::Stream(chunks)) => {
                let items = chunks.into_iter().map(Ok::<Bytes, HttpError>);
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Some(MockResponse::StreamThenError(chunks, err)) => {
                let items = chunks
                    .into_iter()
                    .map(Ok::<Bytes, HttpError>)
                    .chain(std::iter::once(Err(err)));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            Some(MockResponse::StreamThenStall(chunks)) => {
                let stream = futures::stream::iter(chunks.into_iter().map(Ok::<Bytes, HttpError>))
                    .chain(futures::stream::pending());
                Ok(Box::pin(stream))
            }
            Some(MockResponse::Stall) => futures::future::pending().await,
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(mut stream: ByteStream) -> Vec<Result<Bytes, HttpError>> {
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        items
    }

    #[tokio::test]
    async fn test_stream_response() {
        let client = MockHttpClient::new();
        client.set_response("https://example.com/chat", MockResponse::chunks(["a", "b"]));

        let stream = client
            .post_stream("https://example.com/chat", "{}", &Headers::new())
            .await
            .unwrap();
        let items = collect(stream).await;
        assert_eq!(items, vec![Ok(Bytes::from("a")), Ok(Bytes::from("b"))]);

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, "{}");
    }

    #[tokio::test]
    async fn test_stream_then_error() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::StreamThenError(
            vec![Bytes::from("a")],
            HttpError::Other("reset".to_string()),
        ));

        let stream = client
            .post_stream("https://example.com/x", "{}", &Headers::new())
            .await
            .unwrap();
        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], Err(HttpError::Other("reset".to_string())));
    }

    #[tokio::test]
    async fn test_error_response() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::Error(HttpError::ServerError {
            status: 500,
            message: "down".to_string(),
        }));

        let result = client
            .post_stream("https://example.com/x", "{}", &Headers::new())
            .await;
        assert!(matches!(
            result,
            Err(HttpError::ServerError { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_queued_responses_take_priority() {
        let client = MockHttpClient::new();
        client.set_default_response(MockResponse::chunks(["default"]));
        client.push_response(MockResponse::chunks(["first"]));

        let first = collect(
            client
                .post_stream("https://example.com/x", "{}", &Headers::new())
                .await
                .unwrap(),
        )
        .await;
        let second = collect(
            client
                .post_stream("https://example.com/x", "{}", &Headers::new())
                .await
                .unwrap(),
        )
        .await;

        assert_eq!(first, vec![Ok(Bytes::from("first"))]);
        assert_eq!(second, vec![Ok(Bytes::from("default"))]);
    }

    #[tokio::test]
    async fn test_no_response_configured() {
        let client = MockHttpClient::new();
        let result = client
            .post_stream("https://example.com/x", "{}", &Headers::new())
            .await;
        assert!(matches!(result, Err(HttpError::Other(_))));
    }
}
