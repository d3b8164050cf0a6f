//! Single request/response transport used where streaming is unavailable.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResult};
use crate::transport::{EventSink, Transport, TransportKind};
use crate::types::{ChatRequest, StreamMetadata};
use crate::wire::{interpret_fallback_response, FallbackResponse, HealthStatus};

const CONNECTION_FAILED: &str = "Connection failed. Please check if the server is running.";

/// Posts the whole request and synthesizes one chunk plus one end event.
pub struct HttpTransport {
    client: reqwest::Client,
    chat_url: String,
    health_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ChatResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ChatError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            chat_url: config.chat_endpoint(),
            health_url: config.health_endpoint(),
            timeout: config.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue the request, bounded by the configured timeout.
    pub async fn send(&self, request: &ChatRequest) -> ChatResult<FallbackResponse> {
        tokio::time::timeout(self.timeout, self.post(request))
            .await
            .map_err(|_| ChatError::Timeout(self.timeout))?
    }

    async fn post(&self, request: &ChatRequest) -> ChatResult<FallbackResponse> {
        debug!(url = %self.chat_url, "Posting chat request");
        let response = self
            .client
            .post(&self.chat_url)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;
        debug!(status = status.as_u16(), bytes = body.len(), "Chat response received");

        interpret_fallback_response(status.as_u16(), &body)
    }

    /// Query the server's health endpoint.
    pub async fn health(&self) -> ChatResult<HealthStatus> {
        let fetch = async {
            let response = self
                .client
                .get(&self.health_url)
                .send()
                .await
                .map_err(|e| self.map_request_error(e))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| self.map_request_error(e))?;
            if !status.is_success() {
                return Err(ChatError::ServerReported(format!("Server error: {}", status.as_u16())));
            }
            serde_json::from_str::<HealthStatus>(&body)
                .map_err(|e| ChatError::Protocol(format!("unexpected health body: {}", e)))
        };

        tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| ChatError::Timeout(self.timeout))?
    }

    fn map_request_error(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout(self.timeout)
        } else if err.is_connect() {
            debug!(error = %err, "Connection failed");
            ChatError::TransportUnavailable(CONNECTION_FAILED.to_string())
        } else {
            ChatError::TransportUnavailable(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::SingleRequest
    }

    async fn exchange(&self, request: &ChatRequest, sink: &mut EventSink) -> ChatResult<()> {
        let response = self.send(request).await?;
        info!(bytes = response.answer.len(), "Fallback answer received");

        let metadata = response.context.map(|context| StreamMetadata {
            rag_context: Some(context),
            tool_calls: Vec::new(),
        });
        sink.chunk(response.answer.clone(), response.answer.clone(), None)
            .await;
        sink.end(response.answer, metadata).await;
        Ok(())
    }
}
