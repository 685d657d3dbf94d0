//! Error taxonomy for one relay exchange.
//!
//! Every variant is scoped to a single exchange: the client is told, the
//! stored history is left untouched, and the connection stays open.

use std::time::Duration;

use crate::traits::HttpError;

/// Why an exchange did not complete
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelayError {
    /// The inbound frame was not a valid request envelope
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The upstream request could not be opened or returned non-2xx
    #[error("upstream request failed: {0}")]
    Upstream(HttpError),

    /// The upstream stream failed after it had started
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The client went away while frames were being sent
    #[error("client connection closed")]
    ClientGone,
}

/// Failures after the upstream stream has been opened
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    #[error("upstream stream interrupted: {0}")]
    Interrupted(String),

    #[error("upstream stream ended before [DONE]")]
    EndedWithoutDone,

    #[error("no upstream data received for {0:?}")]
    IdleTimeout(Duration),
}

impl RelayError {
    /// Short machine-friendly name, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::MalformedRequest(_) => "malformed_request",
            RelayError::Upstream(_) => "upstream_error",
            RelayError::Stream(_) => "stream_error",
            RelayError::ClientGone => "client_gone",
        }
    }

    /// Text for the error frame sent to the client
    pub fn client_message(&self) -> String {
        match self {
            RelayError::MalformedRequest(detail) => format!(
                "malformed request, expected {{ conversationId: string, messages: [{{ role, content }}] }}: {}",
                detail
            ),
            RelayError::Upstream(err) => format!("upstream request failed: {}", err),
            RelayError::Stream(err) => format!("stream error: {}", err),
            RelayError::ClientGone => "client connection closed".to_string(),
        }
    }
}

impl From<HttpError> for RelayError {
    fn from(err: HttpError) -> Self {
        RelayError::Upstream(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        assert_eq!(
            RelayError::MalformedRequest("x".to_string()).kind(),
            "malformed_request"
        );
        assert_eq!(
            RelayError::Upstream(HttpError::Other("x".to_string())).kind(),
            "upstream_error"
        );
        assert_eq!(
            RelayError::Stream(StreamError::EndedWithoutDone).kind(),
            "stream_error"
        );
        assert_eq!(RelayError::ClientGone.kind(), "client_gone");
    }

    #[test]
    fn test_client_message() {
        let err = RelayError::Upstream(HttpError::ServerError {
            status: 500,
            message: "oops".to_string(),
        });
        assert_eq!(
            err.client_message(),
            "upstream request failed: Server error (500): oops"
        );

        let err: RelayError = StreamError::Interrupted("reset by peer".to_string()).into();
        assert_eq!(
            err.client_message(),
            "stream error: upstream stream interrupted: reset by peer"
        );

        let err = RelayError::MalformedRequest("expected value".to_string());
        assert!(err.client_message().contains("conversationId"));
        assert!(err.client_message().ends_with("expected value"));
    }

    #[test]
    fn test_idle_timeout_display() {
        let err = StreamError::IdleTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "no upstream data received for 30s");
    }
}
