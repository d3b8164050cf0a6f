//! Mock transport for testing.
//!
//! Replays scripted events and captures every request, so session behavior
//! can be exercised without a running server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{ChatError, ChatResult, ExchangeFailure};
use crate::transport::{EventSink, Transport, TransportKind};
use crate::types::{ChatRequest, StreamEvent};

/// One step of a scripted exchange.
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Deliver this event as-is
    Event(StreamEvent),
    /// Return this error from the transport
    Fail(ExchangeFailure),
    /// Wait before the next step
    Delay(Duration),
}

/// Scripted transport; each exchange consumes the next script.
#[derive(Clone)]
pub struct MockTransport {
    kind: TransportKind,
    scripts: Arc<RwLock<Vec<Vec<MockStep>>>>,
    script_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<ChatRequest>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            kind: TransportKind::Streaming,
            scripts: Arc::new(RwLock::new(Vec::new())),
            script_index: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Report a different transport kind.
    pub fn with_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add the script for the next exchange.
    pub fn with_script(self, steps: Vec<MockStep>) -> Self {
        self.scripts.write().push(steps);
        self
    }

    /// Add a script streaming `parts` as chunks followed by an end event.
    pub fn with_reply(self, parts: &[&str]) -> Self {
        let mut aggregate = String::new();
        let mut steps = Vec::with_capacity(parts.len() + 1);
        for part in parts {
            aggregate.push_str(part);
            steps.push(MockStep::Event(StreamEvent::chunk(*part, aggregate.clone())));
        }
        steps.push(MockStep::Event(StreamEvent::end(aggregate)));
        self.with_script(steps)
    }

    /// Add a script that fails immediately.
    pub fn with_failure(self, failure: ExchangeFailure) -> Self {
        self.with_script(vec![MockStep::Fail(failure)])
    }

    /// Requests seen so far, in order.
    pub fn captured_requests(&self) -> Vec<ChatRequest> {
        self.captured.read().clone()
    }

    /// Number of exchanges started.
    pub fn exchange_count(&self) -> usize {
        self.script_index.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn exchange(&self, request: &ChatRequest, sink: &mut EventSink) -> ChatResult<()> {
        self.captured.write().push(request.clone());

        let index = self.script_index.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.read().get(index).cloned();
        let Some(script) = script else {
            return Err(ChatError::TransportUnavailable(format!(
                "no scripted response for exchange {}",
                index
            )));
        };

        for step in script {
            match step {
                MockStep::Event(event) => {
                    sink.send(event).await;
                }
                MockStep::Fail(failure) => {
                    sink.fail(failure).await;
                    return Ok(());
                }
                MockStep::Delay(duration) => tokio::time::sleep(duration).await,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_mock_replays_reply_and_captures_request() {
        let transport = MockTransport::new().with_reply(&["Hi", " there"]);
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = EventSink::new(tx);

        transport
            .exchange(&ChatRequest::new("hello", Some("ctx".into())), &mut sink)
            .await
            .unwrap();
        drop(sink);

        assert_eq!(rx.recv().await, Some(StreamEvent::chunk("Hi", "Hi")));
        assert_eq!(rx.recv().await, Some(StreamEvent::chunk(" there", "Hi there")));
        assert_eq!(rx.recv().await, Some(StreamEvent::end("Hi there")));
        assert_eq!(rx.recv().await, None);

        let requests = transport.captured_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].context.as_deref(), Some("ctx"));
    }

    #[tokio::test]
    async fn test_mock_without_script_is_unavailable() {
        let transport = MockTransport::new();
        let (tx, _rx) = mpsc::channel(8);
        let mut sink = EventSink::new(tx);

        let result = transport.exchange(&ChatRequest::new("q", None), &mut sink).await;
        assert!(matches!(result, Err(ChatError::TransportUnavailable(_))));
        assert_eq!(transport.exchange_count(), 1);
    }
}
