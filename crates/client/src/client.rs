//! WebSocket client for the backend push channel.
//!
//! [`LiveClient`] holds the connection configuration. Call
//! [`LiveClient::connect`] to establish a [`LiveConnection`].

use std::time::Duration;

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Upper bound on a single connection handshake when none is configured.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection settings for the push channel of one backend.
#[derive(Debug, Clone)]
pub struct LiveClient {
    ws_url: String,
    connect_timeout: Duration,
}

/// A live push-channel connection.
pub struct LiveConnection {
    /// Random id for correlating log lines of one connection.
    pub connection_id: String,
    pub ws_stream: WsStream,
}

impl LiveClient {
    /// * `ws_url` - full WebSocket endpoint, e.g. `ws://host:5000/ws`.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open the WebSocket, failing if the handshake does not finish
    /// within the connect timeout.
    pub async fn connect(&self) -> Result<LiveConnection, ClientError> {
        let connection_id = uuid::Uuid::new_v4().to_string();

        let connecting = connect_async(self.ws_url.as_str());
        let handshake = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "Timed out after {:?} connecting to {}",
                    self.connect_timeout, self.ws_url
                ))
            })?;

        let (ws_stream, _response) = handshake.map_err(|e| {
            ClientError::Connection(format!("Failed to connect to {}: {e}", self.ws_url))
        })?;

        tracing::info!(
            connection_id = %connection_id,
            "Connected to push channel at {}",
            self.ws_url,
        );

        Ok(LiveConnection {
            connection_id,
            ws_stream,
        })
    }
}

/// Derive the push-channel URL from the HTTP API base URL:
/// `http` → `ws`, `https` → `wss`, path `/ws`.
pub fn ws_url_from_api_url(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    let swapped = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        trimmed.to_string()
    };
    format!("{swapped}/ws")
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
