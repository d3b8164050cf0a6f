//! Transport trait, event sink and transport selection.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ChatResult, ExchangeFailure};
use crate::http::HttpTransport;
use crate::types::{ChatRequest, StreamEvent, StreamMetadata};
use crate::websocket::WebSocketTransport;

/// Which delivery path a transport uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Persistent bidirectional channel relaying every frame
    Streaming,
    /// One blocking request synthesizing a chunk and an end event
    SingleRequest,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Streaming => f.write_str("streaming"),
            Self::SingleRequest => f.write_str("single-request"),
        }
    }
}

/// Delivers one exchange's request and normalizes the reply into events.
///
/// Implementations push events into the sink in the order they are received.
/// Returning `Err` ends the exchange; the caller turns the error into the
/// terminal `Error` event.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn exchange(&self, request: &ChatRequest, sink: &mut EventSink) -> ChatResult<()>;
}

/// Sending half of an exchange's event stream.
///
/// Guarantees at most one terminal event: anything sent after `End` or
/// `Error` is dropped.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    terminated: bool,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            terminated: false,
        }
    }

    /// Whether a terminal event has been sent.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Send an event. Returns `false` if it was dropped.
    pub async fn send(&mut self, event: StreamEvent) -> bool {
        if self.terminated {
            warn!(?event, "Dropping event after terminal event");
            return false;
        }
        self.terminated = event.is_terminal();
        if self.tx.send(event).await.is_err() {
            debug!("Event receiver dropped");
            return false;
        }
        true
    }

    pub async fn chunk(
        &mut self,
        delta: impl Into<String>,
        aggregate: impl Into<String>,
        metadata: Option<StreamMetadata>,
    ) -> bool {
        self.send(StreamEvent::Chunk {
            delta: delta.into(),
            aggregate: aggregate.into(),
            metadata,
        })
        .await
    }

    pub async fn end(&mut self, aggregate: impl Into<String>, metadata: Option<StreamMetadata>) -> bool {
        self.send(StreamEvent::End {
            aggregate: aggregate.into(),
            metadata,
        })
        .await
    }

    pub async fn fail(&mut self, failure: ExchangeFailure) -> bool {
        self.send(StreamEvent::Error(failure)).await
    }
}

/// Run `transport` for `request`, guaranteeing exactly one terminal event.
pub async fn run_exchange(transport: &dyn Transport, request: &ChatRequest, sink: &mut EventSink) {
    match transport.exchange(request, sink).await {
        Ok(()) if sink.is_terminated() => {}
        Ok(()) => {
            warn!(kind = %transport.kind(), "Transport finished without a terminal event");
            sink.fail(ExchangeFailure::protocol("response ended before it was complete"))
                .await;
        }
        Err(err) => {
            warn!(kind = %transport.kind(), error = %err, "Exchange failed");
            sink.fail(ExchangeFailure::from(&err)).await;
        }
    }
}

/// Chooses the delivery path from the deployment's static capability flag.
pub struct TransportSelector;

impl TransportSelector {
    /// Build the transport for `config`. The choice is fixed for the client's
    /// lifetime and never retried on the other path.
    pub fn select(config: &ClientConfig) -> ChatResult<Arc<dyn Transport>> {
        config.validate()?;
        let transport: Arc<dyn Transport> = if config.streaming {
            Arc::new(WebSocketTransport::new(config))
        } else {
            Arc::new(HttpTransport::new(config)?)
        };
        info!(kind = %transport.kind(), "Selected transport");
        Ok(transport)
    }
}
