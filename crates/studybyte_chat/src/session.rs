//! Chat session controller.
//!
//! Owns the message list of one conversation and runs exchanges against a
//! [`Transport`]. Each exchange moves through
//!
//! ```text
//! Idle ──start──▶ Sent ──Chunk──▶ Streaming ──End──▶ Closed(Completed)
//!                   │                 │
//!                   └─────Error───────┴─────────────▶ Closed(Failed)
//! ```
//!
//! Updates replace the open assistant message's content with the full
//! aggregate text, so applying the same event twice changes nothing.
//!
//! An exchange whose handle is dropped (or a `send` future cancelled) before
//! its terminal event is applied is settled by the controller on the next
//! `start`, `clear` or `settle`: with the terminal event the handle yielded
//! as a stream, or as a protocol failure otherwise.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResult, ExchangeFailure};
use crate::transport::{run_exchange, EventSink, Transport, TransportKind, TransportSelector};
use crate::transcript::Transcript;
use crate::types::{ChatMessage, ChatRequest, ExchangeId, MessageRole, StreamEvent};

/// Events buffered between the transport task and the consumer.
const EVENT_BUFFER: usize = 64;

/// How a closed exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed,
    Failed(ExchangeFailure),
}

impl ExchangeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Lifecycle state of the current exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sent,
    Streaming,
    Closed(ExchangeOutcome),
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The open message changed
    Updated,
    /// The exchange reached its terminal event
    Closed(ExchangeOutcome),
    /// Stale exchange or already closed
    Ignored,
}

/// What the controller needs to know about a handle it no longer drives.
#[derive(Debug, Default)]
struct HandleStatus {
    /// Handle dropped
    released: bool,
    /// Terminal event yielded through the `Stream` impl
    terminal: Option<StreamEvent>,
}

/// Receiving half of one exchange: a finite, non-restartable event sequence.
#[derive(Debug)]
pub struct ExchangeHandle {
    id: ExchangeId,
    events: mpsc::Receiver<StreamEvent>,
    status: Arc<Mutex<HandleStatus>>,
}

impl ExchangeHandle {
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    /// Next event in send order, or `None` once the transport is done.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }
}

impl Stream for ExchangeHandle {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let poll = this.events.poll_recv(cx);
        if let Poll::Ready(Some(event)) = &poll {
            if event.is_terminal() {
                this.status.lock().terminal = Some(event.clone());
            }
        }
        poll
    }
}

impl Drop for ExchangeHandle {
    fn drop(&mut self) {
        self.status.lock().released = true;
    }
}

/// Runs exchanges for one conversation. Only one exchange may be in flight.
pub struct SessionController {
    transport: Arc<dyn Transport>,
    messages: Vec<ChatMessage>,
    state: ExchangeState,
    current: Option<ExchangeId>,
    /// Index of the assistant message receiving updates
    open: Option<usize>,
    /// Shared with the current exchange's handle
    handle_status: Option<Arc<Mutex<HandleStatus>>>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            messages: Vec::new(),
            state: ExchangeState::Idle,
            current: None,
            open: None,
            handle_status: None,
        }
    }

    /// Controller using the transport selected for `config`.
    pub fn from_config(config: &ClientConfig) -> ChatResult<Self> {
        Ok(Self::new(TransportSelector::select(config)?))
    }

    pub fn state(&self) -> &ExchangeState {
        &self.state
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Whether an exchange is waiting for its terminal event and its handle
    /// is still live.
    pub fn is_busy(&self) -> bool {
        self.in_flight() && !self.handle_finished()
    }

    /// Close an exchange whose handle was dropped or has already yielded its
    /// terminal event without it being applied here.
    pub fn settle(&mut self) -> &ExchangeState {
        let Some(id) = self.current.filter(|_| self.in_flight() && self.handle_finished()) else {
            return &self.state;
        };
        let terminal = self
            .handle_status
            .as_ref()
            .and_then(|status| status.lock().terminal.take());
        let event = terminal.unwrap_or_else(|| {
            StreamEvent::Error(ExchangeFailure::protocol(
                "exchange abandoned before its terminal event",
            ))
        });
        debug!(exchange = %id, "Settling exchange released by its handle");
        self.apply(id, event);
        &self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The assistant message currently receiving updates.
    pub fn open_message(&self) -> Option<&ChatMessage> {
        self.open.and_then(|index| self.messages.get(index))
    }

    /// The most recent assistant message.
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }

    /// The assistant message belonging to `exchange`.
    pub fn reply_for(&self, exchange: ExchangeId) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && m.exchange_id == Some(exchange))
    }

    /// Snapshot of the conversation.
    pub fn transcript(&self) -> Transcript {
        Transcript::new(self.messages.clone())
    }

    /// Forget all messages. Not allowed while an exchange is in flight.
    pub fn clear(&mut self) -> ChatResult<()> {
        self.ensure_idle()?;
        self.messages.clear();
        self.state = ExchangeState::Idle;
        self.current = None;
        self.handle_status = None;
        Ok(())
    }

    /// Begin an exchange without waiting for the reply.
    ///
    /// Records the user message and a placeholder reply, then spawns the
    /// transport on the current tokio runtime.
    pub fn start(&mut self, message: &str, context: Option<String>) -> ChatResult<ExchangeHandle> {
        self.ensure_idle()?;

        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let context = context.filter(|c| !c.trim().is_empty());

        let id = ExchangeId::new();
        self.messages.push(ChatMessage::user(message).with_exchange(id));
        self.messages.push(ChatMessage::placeholder(id));
        self.open = Some(self.messages.len() - 1);
        self.current = Some(id);
        self.state = ExchangeState::Sent;

        let request = ChatRequest::new(message, context);
        let transport = Arc::clone(&self.transport);
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let status = Arc::new(Mutex::new(HandleStatus::default()));
        self.handle_status = Some(Arc::clone(&status));
        info!(exchange = %id, kind = %transport.kind(), "Starting exchange");

        tokio::spawn(async move {
            let mut sink = EventSink::new(tx);
            run_exchange(transport.as_ref(), &request, &mut sink).await;
        });

        Ok(ExchangeHandle {
            id,
            events: rx,
            status,
        })
    }

    /// Apply one event of `exchange` to the open assistant message.
    pub fn apply(&mut self, exchange: ExchangeId, event: StreamEvent) -> Applied {
        if self.current != Some(exchange) || !self.in_flight() {
            debug!(exchange = %exchange, "Ignoring event for inactive exchange");
            return Applied::Ignored;
        }
        let Some(message) = self.open.and_then(|index| self.messages.get_mut(index)) else {
            warn!(exchange = %exchange, "No open message for exchange");
            return Applied::Ignored;
        };

        message.is_placeholder = false;
        match event {
            StreamEvent::Chunk {
                aggregate, metadata, ..
            } => {
                message.content = aggregate;
                if metadata.is_some() {
                    message.metadata = metadata;
                }
                self.state = ExchangeState::Streaming;
                Applied::Updated
            }
            StreamEvent::End {
                aggregate,
                metadata,
            } => {
                message.content = aggregate;
                if metadata.is_some() {
                    message.metadata = metadata;
                }
                self.close(exchange, ExchangeOutcome::Completed)
            }
            StreamEvent::Error(failure) => {
                message.content = format!("Error: {}", failure.message);
                self.close(exchange, ExchangeOutcome::Failed(failure))
            }
        }
    }

    /// Consume `handle` until its terminal event, calling `on_update` after
    /// every change to the reply.
    pub async fn drive<F>(&mut self, mut handle: ExchangeHandle, mut on_update: F) -> ExchangeOutcome
    where
        F: FnMut(&ChatMessage),
    {
        let id = handle.id();
        while let Some(event) = handle.next_event().await {
            match self.apply(id, event) {
                Applied::Ignored => {}
                Applied::Updated => self.notify(id, &mut on_update),
                Applied::Closed(outcome) => {
                    self.notify(id, &mut on_update);
                    return outcome;
                }
            }
        }

        if self.current == Some(id) {
            if let ExchangeState::Closed(outcome) = &self.state {
                return outcome.clone();
            }
        }

        let failure = ExchangeFailure::protocol("event stream ended without a terminal event");
        match self.apply(id, StreamEvent::Error(failure.clone())) {
            Applied::Closed(outcome) => {
                self.notify(id, &mut on_update);
                outcome
            }
            _ => ExchangeOutcome::Failed(failure),
        }
    }

    /// Start an exchange and drive it to completion.
    pub async fn send<F>(
        &mut self,
        message: &str,
        context: Option<String>,
        on_update: F,
    ) -> ChatResult<ExchangeOutcome>
    where
        F: FnMut(&ChatMessage),
    {
        let handle = self.start(message, context)?;
        Ok(self.drive(handle, on_update).await)
    }

    fn notify<F: FnMut(&ChatMessage)>(&self, exchange: ExchangeId, on_update: &mut F) {
        if let Some(message) = self.reply_for(exchange) {
            on_update(message);
        }
    }

    fn close(&mut self, exchange: ExchangeId, outcome: ExchangeOutcome) -> Applied {
        match &outcome {
            ExchangeOutcome::Completed => info!(exchange = %exchange, "Exchange completed"),
            ExchangeOutcome::Failed(failure) => {
                warn!(exchange = %exchange, %failure, "Exchange failed")
            }
        }
        self.open = None;
        self.state = ExchangeState::Closed(outcome.clone());
        Applied::Closed(outcome)
    }

    fn in_flight(&self) -> bool {
        matches!(self.state, ExchangeState::Sent | ExchangeState::Streaming)
    }

    fn handle_finished(&self) -> bool {
        self.handle_status.as_ref().is_some_and(|status| {
            let status = status.lock();
            status.released || status.terminal.is_some()
        })
    }

    fn ensure_idle(&mut self) -> ChatResult<()> {
        self.settle();
        match (self.is_busy(), self.current) {
            (true, Some(current)) => Err(ChatError::ExchangeInProgress(current.to_string())),
            (true, None) => Err(ChatError::ExchangeInProgress("unknown".to_string())),
            _ => Ok(()),
        }
    }
}
