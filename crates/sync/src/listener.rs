//! Push-channel listener.
//!
//! Holds one WebSocket connection per session and applies server pushes
//! straight to the cache with [`QueryCache::patch`], bypassing the
//! fetch/invalidate path. Messages are applied in arrival order. Nothing
//! is ever sent back to the server.

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use onair_client::client::{LiveClient, LiveConnection, WsStream};
use onair_client::messages::{message_type, parse_message, PushMessage};
use onair_client::reconnect::{reconnect_loop, ConnectionState, ReconnectConfig};

use crate::cache::QueryCache;
use crate::keys::QueryKey;

#[derive(Debug, Clone)]
pub struct ListenerOptions {
    /// Reconnect after the connection drops. When false the listener goes
    /// `Closed` after the first disconnect.
    pub reconnect: bool,
    pub backoff: ReconnectConfig,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            backoff: ReconnectConfig::default(),
        }
    }
}

/// Running listener task.
pub struct ListenerHandle {
    pub state: watch::Receiver<ConnectionState>,
    pub task: JoinHandle<()>,
}

/// Spawn the listener. It runs until `cancel` fires, or until the first
/// disconnect when reconnecting is disabled.
pub fn spawn(
    client: LiveClient,
    cache: QueryCache,
    options: ListenerOptions,
    cancel: CancellationToken,
) -> ListenerHandle {
    let (state_tx, state) = watch::channel(ConnectionState::Idle);

    let task = tokio::spawn(async move {
        tracing::info!(url = %client.ws_url(), "Starting push listener");
        run_listener(&client, &cache, &options, &cancel, &state_tx).await;
        state_tx.send_replace(ConnectionState::Closed);
        tracing::info!("Push listener exited");
    });

    ListenerHandle { state, task }
}

/// Connect, process frames, reconnect. Returns when cancelled or when the
/// connection is lost with reconnecting disabled.
async fn run_listener(
    client: &LiveClient,
    cache: &QueryCache,
    options: &ListenerOptions,
    cancel: &CancellationToken,
    state: &watch::Sender<ConnectionState>,
) {
    let mut pending: Option<LiveConnection> = None;

    loop {
        let conn = match pending.take() {
            Some(conn) => conn,
            None => {
                state.send_replace(ConnectionState::Connecting);
                let result = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = client.connect() => result,
                };
                match result {
                    Ok(conn) => conn,
                    Err(e) if options.reconnect => {
                        tracing::warn!(error = %e, "Connection failed, entering reconnect loop");
                        match reconnect_loop(client, &options.backoff, cancel, state).await {
                            Some(conn) => conn,
                            None => return,
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Connection failed, reconnect disabled");
                        return;
                    }
                }
            }
        };

        let LiveConnection {
            connection_id,
            mut ws_stream,
        } = conn;
        state.send_replace(ConnectionState::Open);

        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_stream.close(None).await;
                return;
            }
            _ = process_frames(&mut ws_stream, &connection_id, cache) => {}
        }

        if cancel.is_cancelled() {
            return;
        }
        if !options.reconnect {
            tracing::info!(connection_id = %connection_id, "Push channel lost, reconnect disabled");
            return;
        }

        tracing::info!(
            connection_id = %connection_id,
            "Push channel lost, entering reconnect loop",
        );
        match reconnect_loop(client, &options.backoff, cancel, state).await {
            Some(conn) => pending = Some(conn),
            None => return,
        }
    }
}

/// Read frames until the socket closes or errors.
async fn process_frames(ws_stream: &mut WsStream, connection_id: &str, cache: &QueryCache) {
    while let Some(frame) = ws_stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                apply_message(&text, cache);
            }
            Ok(Message::Binary(_)) => {
                tracing::trace!(connection_id, "Ignoring binary frame");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Answered by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(connection_id, ?frame, "Push channel closed by server");
                break;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::warn!(connection_id, error = %e, "Push channel receive error");
                break;
            }
        }
    }
}

/// Apply one text frame to the cache. Returns `true` if the cache was
/// patched.
pub fn apply_message(text: &str, cache: &QueryCache) -> bool {
    match parse_message(text) {
        Ok(PushMessage::PlaybackUpdate(states)) => {
            tracing::debug!(studios = states.len(), "Applying playback update");
            cache.patch(&QueryKey::playback(), states);
            true
        }
        Err(e) => {
            match message_type(text) {
                Some(kind) if kind == "playback_update" => {
                    tracing::warn!(error = %e, "Malformed playback update");
                }
                Some(kind) => {
                    tracing::debug!(kind = %kind, "Ignoring unknown push message");
                }
                None => {
                    tracing::warn!(error = %e, "Ignoring malformed push frame");
                }
            }
            false
        }
    }
}
