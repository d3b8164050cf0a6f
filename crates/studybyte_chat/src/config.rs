//! Client configuration.
//!
//! Resolution order, later wins:
//! 1. development defaults
//! 2. `<root>/.studybyte/settings.json`
//! 3. `STUDYBYTE_*` environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

/// Path of the fallback endpoint below `api_url`.
pub const CHAT_PATH: &str = "/chat/with-context";
/// Path of the streaming endpoint below `ws_url`.
pub const STREAM_PATH: &str = "/ws/chat";

pub const ENV_API_URL: &str = "STUDYBYTE_API_URL";
pub const ENV_WS_URL: &str = "STUDYBYTE_WS_URL";
pub const ENV_STREAMING: &str = "STUDYBYTE_STREAMING";
pub const ENV_TIMEOUT_SECS: &str = "STUDYBYTE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for one client instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the HTTP API, e.g. `http://localhost:8000`
    pub api_url: String,
    /// Base URL of the WebSocket API, e.g. `ws://localhost:8000`
    pub ws_url: String,
    /// Use the persistent streaming channel instead of single requests
    pub streaming: bool,
    /// Timeout for a single fallback request, in seconds
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// Optional overrides read from the settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Settings {
    api_url: Option<String>,
    ws_url: Option<String>,
    streaming: Option<bool>,
    timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Local development server with streaming enabled.
    pub fn development() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000".to_string(),
            streaming: true,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Hosted deployment below `<origin>/api`. Serverless hosting cannot keep
    /// sockets open, so streaming is off.
    pub fn production(origin: &str) -> ChatResult<Self> {
        let origin = origin.trim_end_matches('/');
        let ws_origin = if let Some(host) = origin.strip_prefix("https://") {
            format!("wss://{}", host)
        } else if let Some(host) = origin.strip_prefix("http://") {
            format!("ws://{}", host)
        } else {
            return Err(ChatError::InvalidConfig(format!(
                "origin must start with http:// or https://: {}",
                origin
            )));
        };

        Ok(Self {
            api_url: format!("{}/api", origin),
            ws_url: format!("{}/api", ws_origin),
            streaming: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Location of the settings file below `root`.
    pub fn settings_path(root: &Path) -> PathBuf {
        root.join(".studybyte").join("settings.json")
    }

    /// Development defaults overlaid with the settings file, if present.
    pub fn from_settings(root: &Path) -> ChatResult<Self> {
        let mut config = Self::development();
        let path = Self::settings_path(root);
        if !path.exists() {
            debug!("No settings file at {:?}", path);
            return Ok(config);
        }

        debug!("Loading settings from {:?}", path);
        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| ChatError::InvalidConfig(format!("{}: {}", path.display(), e)))?;

        if let Some(api_url) = settings.api_url {
            config.api_url = api_url;
        }
        if let Some(ws_url) = settings.ws_url {
            config.ws_url = ws_url;
        }
        if let Some(streaming) = settings.streaming {
            config.streaming = streaming;
        }
        if let Some(timeout_secs) = settings.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        Ok(config)
    }

    /// Apply `STUDYBYTE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> ChatResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ChatResult<Self> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_url) = lookup(ENV_API_URL) {
            self.api_url = api_url;
        }
        if let Some(ws_url) = lookup(ENV_WS_URL) {
            self.ws_url = ws_url;
        }
        if let Some(streaming) = lookup(ENV_STREAMING) {
            self.streaming = parse_flag(ENV_STREAMING, &streaming)?;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                ChatError::InvalidConfig(format!("{} must be a number: {}", ENV_TIMEOUT_SECS, timeout))
            })?;
        }
        Ok(self)
    }

    /// Settings file, then environment, then validation.
    pub fn load(root: &Path) -> ChatResult<Self> {
        let config = Self::from_settings(root)?.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChatResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ChatError::InvalidConfig(format!(
                "apiUrl must be an http(s) URL: {}",
                self.api_url
            )));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ChatError::InvalidConfig(format!(
                "wsUrl must be a ws(s) URL: {}",
                self.ws_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ChatError::InvalidConfig("timeoutSecs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// URL of the fallback endpoint.
    pub fn chat_endpoint(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), CHAT_PATH)
    }

    /// URL of the streaming endpoint.
    pub fn stream_endpoint(&self) -> String {
        format!("{}{}", self.ws_url.trim_end_matches('/'), STREAM_PATH)
    }

    /// URL of the health endpoint.
    pub fn health_endpoint(&self) -> String {
        format!("{}/", self.api_url.trim_end_matches('/'))
    }
}

fn parse_flag(key: &str, value: &str) -> ChatResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ChatError::InvalidConfig(format!(
            "{} must be true or false: {}",
            key, other
        ))),
    }
}
