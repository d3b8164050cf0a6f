//! Streaming transport over a WebSocket channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResult};
use crate::transport::{EventSink, Transport, TransportKind};
use crate::types::ChatRequest;
use crate::wire::FrameDecoder;

/// Opens one socket per exchange and relays every server frame as an event.
///
/// There is no timeout on this path: the exchange lasts until the server
/// sends a terminal frame or the connection drops.
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            url: config.stream_endpoint(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Streaming
    }

    async fn exchange(&self, request: &ChatRequest, sink: &mut EventSink) -> ChatResult<()> {
        debug!(url = %self.url, "Opening stream");
        let (mut socket, _) = connect_async(self.url.as_str()).await.map_err(|e| {
            ChatError::TransportUnavailable(format!("WebSocket connection error: {}", e))
        })?;

        let payload = serde_json::to_string(request)?;
        socket
            .send(WsMessage::Text(payload))
            .await
            .map_err(|e| ChatError::TransportUnavailable(format!("failed to send request: {}", e)))?;

        let mut decoder = FrameDecoder::new();
        while let Some(message) = socket.next().await {
            let message = message
                .map_err(|e| ChatError::TransportUnavailable(format!("connection lost: {}", e)))?;

            match message {
                WsMessage::Text(text) => {
                    let event = decoder.decode(&text)?;
                    let terminal = event.is_terminal();
                    sink.send(event).await;
                    if terminal {
                        info!(bytes = decoder.aggregate().len(), "Stream closed by terminal frame");
                        if let Err(e) = socket.close(None).await {
                            debug!(error = %e, "Error closing stream");
                        }
                        return Ok(());
                    }
                }
                WsMessage::Binary(_) => {
                    return Err(ChatError::Protocol("unexpected binary frame".to_string()));
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }

        Err(ChatError::Protocol(
            "connection closed before the response was complete".to_string(),
        ))
    }
}
