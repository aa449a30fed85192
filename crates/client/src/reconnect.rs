//! Exponential-backoff reconnection for the push channel.
//!
//! When the connection drops, the listener calls [`reconnect_loop`] to
//! keep retrying with growing, jittered delays until the connection is
//! restored or the [`CancellationToken`] is triggered.

use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::client::{LiveClient, LiveConnection};

/// Lifecycle of the push-channel connection.
///
/// `Idle → Connecting → Open → Backoff → Connecting → ...`, ending in
/// `Closed` on cancellation or when reconnecting is disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Backoff { attempt: u32, delay: Duration },
    Closed,
}

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the un-jittered delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Up to this fraction of the delay is added at random to each wait.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// `delay` plus a random extra of at most `delay * config.jitter`.
pub fn jittered(delay: Duration, config: &ReconnectConfig) -> Duration {
    let max_extra_ms = (delay.as_millis() as f64 * config.jitter.clamp(0.0, 1.0)) as u64;
    if max_extra_ms == 0 {
        return delay;
    }
    let extra_ms = rand::rng().random_range(0..=max_extra_ms);
    delay + Duration::from_millis(extra_ms)
}

/// Wait, then try to reconnect, repeating with exponential backoff.
///
/// Publishes `Backoff` while waiting and `Connecting` while dialing.
/// Returns `Some(connection)` once a connection succeeds, or `None` if
/// `cancel` fires first.
pub async fn reconnect_loop(
    client: &LiveClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
    state: &watch::Sender<ConnectionState>,
) -> Option<LiveConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let wait = jittered(delay, config);
        state.send_replace(ConnectionState::Backoff { attempt, delay: wait });
        tracing::info!(
            url = %client.ws_url(),
            attempt,
            delay_ms = wait.as_millis() as u64,
            "Reconnecting to push channel",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        state.send_replace(ConnectionState::Connecting);
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Reconnected to push channel");
                        return Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}
