//! One relay exchange, from inbound request to committed history.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::models::{ClientRequest, Message};
use crate::sse::{EventStreamDecoder, StreamEvent};
use crate::store::ConversationStore;
use crate::traits::{ByteStream, FrameSink, HttpError};

use super::error::{RelayError, StreamError};
use super::frame::OutboundFrame;
use super::upstream::UpstreamClient;

/// Where an exchange is in its lifecycle.
///
/// `Idle -> AwaitingUpstream -> Streaming -> Completed | Failed`. Only
/// `Completed` commits history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingUpstream,
    Streaming,
    Completed,
    Failed,
}

/// Outcome of an exchange that reached `[DONE]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSummary {
    pub conversation_id: String,
    /// Full assistant reply, concatenated in arrival order
    pub reply: String,
    /// Whether history was appended (false when the reply was empty)
    pub committed: bool,
    /// Upstream records that failed to decode and were skipped
    pub decode_errors: usize,
}

/// Transient state for one request, dropped when the stream ends
struct PendingExchange {
    conversation_id: String,
    /// Stored history followed by the new messages, sent upstream
    context: Vec<Message>,
    incoming: Vec<Message>,
    reply: String,
    state: ExchangeState,
    decode_errors: usize,
}

impl PendingExchange {
    fn new(conversation_id: &str, history: Vec<Message>, incoming: Vec<Message>) -> Self {
        let mut context = history;
        context.extend(incoming.iter().cloned());
        Self {
            conversation_id: conversation_id.to_string(),
            context,
            incoming,
            reply: String::new(),
            state: ExchangeState::Idle,
            decode_errors: 0,
        }
    }

    fn advance(&mut self, next: ExchangeState) {
        debug!(
            "Exchange {} {:?} -> {:?}",
            self.conversation_id, self.state, next
        );
        self.state = next;
    }

    /// Messages to append on completion, or `None` when nothing was said
    fn into_commit(self) -> (ExchangeSummary, Option<Vec<Message>>) {
        let committed = !self.reply.is_empty();
        let messages = committed.then(|| {
            let mut messages = self.incoming;
            messages.push(Message::assistant(self.reply.clone()));
            messages
        });
        let summary = ExchangeSummary {
            conversation_id: self.conversation_id,
            reply: self.reply,
            committed,
            decode_errors: self.decode_errors,
        };
        (summary, messages)
    }
}

/// Relays requests from one client to the upstream API.
///
/// A session holds no per-connection state of its own, so one instance can
/// be shared by every connection; all exchanges meet only in the store.
#[derive(Debug, Clone)]
pub struct RelaySession {
    store: ConversationStore,
    upstream: UpstreamClient,
    idle_timeout: Option<Duration>,
}

impl RelaySession {
    pub fn new(store: ConversationStore, upstream: UpstreamClient) -> Self {
        Self {
            store,
            upstream,
            idle_timeout: None,
        }
    }

    /// Fail an exchange when the upstream is silent for longer than `timeout`
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle one raw inbound text frame.
    ///
    /// Frames that are not a valid request envelope get an error frame and
    /// never reach the upstream.
    pub async fn handle_frame(
        &self,
        raw: &str,
        sink: &dyn FrameSink,
    ) -> Result<ExchangeSummary, RelayError> {
        let request: ClientRequest = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(e) => {
                let err = RelayError::MalformedRequest(e.to_string());
                self.report(None, &err, sink).await;
                return Err(err);
            }
        };
        self.handle(&request.conversation_id, request.messages, sink)
            .await
    }

    /// Run one exchange for `conversation_id` with the newly submitted messages.
    ///
    /// Every failure is reported to the client as an error frame (unless the
    /// client itself is gone) and leaves the stored history untouched.
    pub async fn handle(
        &self,
        conversation_id: &str,
        incoming: Vec<Message>,
        sink: &dyn FrameSink,
    ) -> Result<ExchangeSummary, RelayError> {
        let result = self.run(conversation_id, incoming, sink).await;
        if let Err(err) = &result {
            self.report(Some(conversation_id), err, sink).await;
        }
        result
    }

    async fn run(
        &self,
        conversation_id: &str,
        incoming: Vec<Message>,
        sink: &dyn FrameSink,
    ) -> Result<ExchangeSummary, RelayError> {
        validate(conversation_id, &incoming)?;

        let history = self.store.get(conversation_id).await;
        let mut exchange = PendingExchange::new(conversation_id, history, incoming);
        info!(
            "Exchange started for {} ({} messages of context)",
            conversation_id,
            exchange.context.len()
        );

        exchange.advance(ExchangeState::AwaitingUpstream);
        let mut body = match self.open_upstream(&exchange.context).await {
            Ok(body) => body,
            Err(e) => {
                exchange.advance(ExchangeState::Failed);
                return Err(RelayError::Upstream(e));
            }
        };

        exchange.advance(ExchangeState::Streaming);
        if let Err(e) = self.stream_reply(&mut exchange, &mut body, sink).await {
            exchange.advance(ExchangeState::Failed);
            return Err(e);
        }
        drop(body);

        exchange.advance(ExchangeState::Completed);
        let (summary, commit) = exchange.into_commit();
        if let Some(messages) = commit {
            self.store.append(conversation_id, messages).await;
        } else {
            debug!("Empty reply for {}, history left unchanged", conversation_id);
        }

        if sink.send_frame(OutboundFrame::Done).await.is_err() {
            debug!("Client left before [DONE] for {}", conversation_id);
        }
        info!(
            "Exchange completed for {} ({} chars, {} decode errors)",
            conversation_id,
            summary.reply.len(),
            summary.decode_errors
        );
        Ok(summary)
    }

    /// Forward content until `[DONE]`; anything else ending the body is an error
    async fn stream_reply(
        &self,
        exchange: &mut PendingExchange,
        body: &mut ByteStream,
        sink: &dyn FrameSink,
    ) -> Result<(), RelayError> {
        let mut decoder = EventStreamDecoder::new();

        loop {
            let chunk = match self.next_chunk(body).await? {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Err(StreamError::Interrupted(e.to_string()).into()),
                None => return Err(StreamError::EndedWithoutDone.into()),
            };

            for event in decoder.feed(&chunk) {
                match event {
                    Ok(StreamEvent::Done) => return Ok(()),
                    Ok(event) => {
                        let Some(content) = event.content() else {
                            continue;
                        };
                        exchange.reply.push_str(content);
                        sink.send_frame(OutboundFrame::content(content))
                            .await
                            .map_err(|_| RelayError::ClientGone)?;
                    }
                    Err(e) => {
                        exchange.decode_errors += 1;
                        warn!(
                            "Skipping undecodable record for {}: {}",
                            exchange.conversation_id, e
                        );
                    }
                }
            }
        }
    }

    /// Open the upstream stream, bounded by the idle timeout when one is set
    async fn open_upstream(&self, context: &[Message]) -> Result<ByteStream, HttpError> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.upstream.open_stream(context))
                .await
                .unwrap_or_else(|_| {
                    Err(HttpError::Timeout(format!(
                        "no response headers within {:?}",
                        limit
                    )))
                }),
            None => self.upstream.open_stream(context).await,
        }
    }

    async fn next_chunk(
        &self,
        body: &mut ByteStream,
    ) -> Result<Option<Result<Bytes, HttpError>>, StreamError> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, body.next())
                .await
                .map_err(|_| StreamError::IdleTimeout(limit)),
            None => Ok(body.next().await),
        }
    }

    async fn report(&self, conversation_id: Option<&str>, err: &RelayError, sink: &dyn FrameSink) {
        warn!(
            "Exchange for {} failed ({}): {}",
            conversation_id.unwrap_or("<unknown>"),
            err.kind(),
            err
        );
        if matches!(err, RelayError::ClientGone) {
            return;
        }
        if let Err(e) = sink.send_frame(OutboundFrame::error(err.client_message())).await {
            debug!("Could not deliver error frame: {}", e);
        }
    }
}

fn validate(conversation_id: &str, incoming: &[Message]) -> Result<(), RelayError> {
    if conversation_id.is_empty() {
        return Err(RelayError::MalformedRequest(
            "conversationId must be a non-empty string".to_string(),
        ));
    }
    if incoming.is_empty() {
        debug!("Empty batch for {}, regenerating from history", conversation_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse, RecordingSink};
    use crate::models::Role;
    use std::sync::Arc;

    fn session(http: &MockHttpClient) -> RelaySession {
        let upstream = UpstreamClient::new(
            Arc::new(http.clone()),
            "https://up.example/chat",
            "key",
            "model-x",
        );
        RelaySession::new(ConversationStore::new(), upstream)
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{}\"}}}}]}}\n\n",
            text
        )
    }

    #[test]
    fn test_pending_exchange_context_order() {
        let exchange = PendingExchange::new(
            "c1",
            vec![Message::user("a"), Message::assistant("b")],
            vec![Message::user("c")],
        );
        let contents: Vec<&str> = exchange.context.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(exchange.state, ExchangeState::Idle);
    }

    #[test]
    fn test_empty_reply_commits_nothing() {
        let exchange = PendingExchange::new("c1", vec![], vec![Message::user("hi")]);
        let (summary, commit) = exchange.into_commit();
        assert!(!summary.committed);
        assert!(commit.is_none());
    }

    #[test]
    fn test_validate() {
        assert!(validate("c1", &[Message::user("hi")]).is_ok());
        assert!(validate("c1", &[]).is_ok());
        assert!(validate("  ", &[Message::user("hi")]).is_ok());
        assert!(matches!(
            validate("", &[Message::user("hi")]),
            Err(RelayError::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_forwards_and_commits() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::chunks([
            delta("He"),
            delta("llo"),
            "data: [DONE]\n\n".to_string(),
        ]));
        let session = session(&http);
        let sink = RecordingSink::new();

        let summary = session
            .handle("c1", vec![Message::user("hi")], &sink)
            .await
            .unwrap();

        assert_eq!(summary.reply, "Hello");
        assert!(summary.committed);
        assert_eq!(
            sink.frames(),
            vec![
                OutboundFrame::content("He"),
                OutboundFrame::content("llo"),
                OutboundFrame::Done,
            ]
        );

        let history = session.store().get("c1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].content, "Hello");
    }

    #[tokio::test]
    async fn test_malformed_frame_skips_upstream() {
        let http = MockHttpClient::new();
        let session = session(&http);
        let sink = RecordingSink::new();

        let result = session.handle_frame("not json", &sink).await;
        assert!(matches!(result, Err(RelayError::MalformedRequest(_))));
        assert!(http.get_requests().is_empty());

        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_error());
    }

    #[tokio::test]
    async fn test_records_after_done_are_ignored() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::chunks([
            format!("{}data: [DONE]\n\n{}", delta("a"), delta("late")),
        ]));
        let session = session(&http);
        let sink = RecordingSink::new();

        let summary = session
            .handle("c1", vec![Message::user("hi")], &sink)
            .await
            .unwrap();
        assert_eq!(summary.reply, "a");
        assert_eq!(sink.frames().last(), Some(&OutboundFrame::Done));
    }

    #[tokio::test]
    async fn test_client_gone_stops_exchange() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::chunks([
            delta("one"),
            delta("two"),
            "data: [DONE]\n\n".to_string(),
        ]));
        let session = session(&http);
        let sink = RecordingSink::new().fail_after(1);

        let result = session.handle("c1", vec![Message::user("hi")], &sink).await;
        assert_eq!(result, Err(RelayError::ClientGone));
        assert_eq!(sink.frames(), vec![OutboundFrame::content("one")]);
        assert!(!session.store().contains("c1").await);
    }

    #[tokio::test]
    async fn test_upstream_error_reported() {
        let http = MockHttpClient::new();
        http.set_default_response(MockResponse::Error(HttpError::ConnectionFailed(
            "refused".to_string(),
        )));
        let session = session(&http);
        let sink = RecordingSink::new();

        let result = session.handle("c1", vec![Message::user("hi")], &sink).await;
        assert!(matches!(result, Err(RelayError::Upstream(_))));
        assert_eq!(sink.frames().len(), 1);
        assert!(sink.frames()[0].is_error());
    }
}
