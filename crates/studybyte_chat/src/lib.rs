//! # studybyte_chat - Streaming chat client for StudyByte
//!
//! This crate runs chat exchanges against the StudyByte assistant server:
//! - Sends one user message (with optional study context) per exchange
//! - Receives zero or more partial updates and exactly one terminal outcome
//! - Replaces the assistant message with the full aggregate on every update
//! - Falls back to a single HTTP request where sockets are unavailable
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐      ┌─────────────────────┐
//! │  SessionController  │─────▶│  TransportSelector  │
//! │  (reducer, state)   │      └──────────┬──────────┘
//! └──────────▲──────────┘                 │
//!            │ StreamEvent     ┌──────────┴──────────┐
//!            │ (mpsc)          ▼                     ▼
//!            │        ┌────────────────┐   ┌────────────────┐
//!            └────────│ WebSocket      │   │ HTTP fallback  │
//!                     │ (streaming)    │   │ (one request)  │
//!                     └────────────────┘   └────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use studybyte_chat::{ClientConfig, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::development();
//!     let mut session = SessionController::from_config(&config)?;
//!
//!     let outcome = session
//!         .send("Explain the quantitative reasoning section", None, |reply| {
//!             println!("{}", reply.content);
//!         })
//!         .await?;
//!     println!("finished: {:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod types;
pub mod websocket;
pub mod wire;

pub use config::ClientConfig;
pub use error::{ChatError, ChatResult, ExchangeFailure, FailureKind};
pub use http::HttpTransport;
pub use mock::{MockStep, MockTransport};
pub use session::{Applied, ExchangeHandle, ExchangeOutcome, ExchangeState, SessionController};
pub use transcript::Transcript;
pub use transport::{run_exchange, EventSink, Transport, TransportKind, TransportSelector};
pub use types::*;
pub use websocket::WebSocketTransport;
pub use wire::{FallbackResponse, FrameDecoder, HealthStatus, ServerFrame};
