//! `onair-monitor` -- headless studio monitor.
//!
//! Opens an automation session against the backend and logs push-channel
//! state, action notifications and a per-studio playback summary until
//! interrupted.
//!
//! # Environment variables
//!
//! | Variable                    | Default                  | Description                        |
//! |-----------------------------|--------------------------|------------------------------------|
//! | `ONAIR_API_URL`             | `http://localhost:5000`  | Backend base URL                   |
//! | `ONAIR_WS_URL`              | derived from API URL     | Push-channel endpoint              |
//! | `ONAIR_API_TOKEN`           | --                       | Bearer token for REST calls        |
//! | `PLAYBACK_POLL_INTERVAL_MS` | `5000`                   | Playback refresh fallback, 0 = off |
//! | `WS_RECONNECT`              | `true`                   | Reconnect the push channel         |
//!
//! See `SessionConfig::from_env` for the full list.

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onair_monitor::{describe_connection, notification_line, playback_summary};
use onair_sync::{AutomationContext, SessionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onair_monitor=info,onair_sync=info,onair_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env()?;
    tracing::info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        poll_interval_ms = config.playback_poll_interval.as_millis() as u64,
        reconnect = config.reconnect,
        "Starting onair-monitor",
    );

    let ctx = AutomationContext::start(config)?;
    let mut notifications = ctx.notifications();
    let mut listener_state = ctx.listener_state();
    let mut playback = ctx.playback();

    let mut listener_alive = true;
    let mut last_update = None;
    let mut last_error: Option<String> = None;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted");
                break;
            }
            changed = listener_state.changed(), if listener_alive => {
                if changed.is_err() {
                    listener_alive = false;
                    continue;
                }
                let state = listener_state.borrow_and_update().clone();
                tracing::info!(state = %describe_connection(&state), "Push channel");
            }
            received = notifications.recv() => match received {
                Ok(notification) if notification.is_error() => {
                    tracing::warn!("{}", notification_line(&notification));
                }
                Ok(notification) => {
                    tracing::info!("{}", notification_line(&notification));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification receiver lagged");
                }
                Err(RecvError::Closed) => break,
            },
            changed = playback.changed() => {
                if !changed {
                    break;
                }
                let snapshot = playback.snapshot();
                if snapshot.error != last_error {
                    if let Some(error) = &snapshot.error {
                        tracing::warn!(error = %error, "Playback refresh failed");
                    }
                    last_error = snapshot.error.clone();
                }
                if snapshot.updated_at == last_update {
                    continue;
                }
                last_update = snapshot.updated_at;
                if let Some(states) = playback.value() {
                    for line in playback_summary(&states) {
                        tracing::info!("{line}");
                    }
                }
            }
        }
    }

    ctx.shutdown().await;
    Ok(())
}
