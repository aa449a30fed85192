//! Periodic playback refresh.
//!
//! Push updates can be missed while the socket is down, so playback is
//! also invalidated on a fixed interval. Push and poll results are applied
//! in whatever order they land.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cache::QueryCache;
use crate::keys::QueryKey;

/// Spawn the poller. Returns `None` when `interval` is zero.
pub fn spawn(
    cache: QueryCache,
    interval: Duration,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Playback polling disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial value comes
        // from the observer itself.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => cache.invalidate(&QueryKey::playback()),
            }
        }
        tracing::debug!("Playback poller stopped");
    }))
}
