//! Log-line rendering for the studio monitor.
//!
//! Kept separate from `main.rs` so the formatting can be tested without
//! a backend.

use onair_client::reconnect::ConnectionState;
use onair_core::duration::format_duration;
use onair_core::models::{PlaybackState, PlaybackStates, PlaybackStatus};
use onair_core::types::Studio;
use onair_events::{Notification, NotificationKind};

/// One-line summary of a studio, e.g.
/// `Studio A: playing "Station ID" 0:12 / 1:15, next "News"`.
pub fn studio_summary(studio: Studio, state: &PlaybackState) -> String {
    let status = match state.status {
        PlaybackStatus::Playing => "playing",
        PlaybackStatus::Paused => "paused",
        PlaybackStatus::Stopped => "stopped",
    };

    let mut line = format!("Studio {studio}: {status}");
    if let Some(track) = &state.current_track {
        let total = track
            .duration_formatted
            .clone()
            .unwrap_or_else(|| format_duration(track.duration));
        line.push_str(&format!(
            " \"{}\" {} / {}",
            track.title,
            format_duration(state.current_position),
            total
        ));
    }
    if let Some(next) = &state.next_track {
        line.push_str(&format!(", next \"{}\"", next.title));
    }
    line
}

/// Summaries for every studio, in studio order. Studios missing from the
/// payload are reported as having no data.
pub fn playback_summary(states: &PlaybackStates) -> Vec<String> {
    Studio::ALL
        .iter()
        .map(|studio| match states.get(studio) {
            Some(state) => studio_summary(*studio, state),
            None => format!("Studio {studio}: no data"),
        })
        .collect()
}

pub fn describe_connection(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Idle => "idle".to_string(),
        ConnectionState::Connecting => "connecting".to_string(),
        ConnectionState::Open => "connected".to_string(),
        ConnectionState::Backoff { attempt, delay } => {
            format!("reconnecting (attempt {attempt}, in {}ms)", delay.as_millis())
        }
        ConnectionState::Closed => "closed".to_string(),
    }
}

pub fn notification_line(notification: &Notification) -> String {
    let prefix = match notification.kind {
        NotificationKind::Success => "OK",
        NotificationKind::Error => "ERROR",
    };
    match &notification.message {
        Some(message) => format!("[{prefix}] {}: {message}", notification.title),
        None => format!("[{prefix}] {}", notification.title),
    }
}
