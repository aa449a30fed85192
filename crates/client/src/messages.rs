//! Push-channel message types and parser.
//!
//! The backend sends JSON messages over WebSocket with the shape
//! `{"type": "<kind>", "data": {...}}`. This module deserializes them
//! into a strongly-typed [`PushMessage`] enum.

use serde::Deserialize;

use onair_core::models::{normalize_playback, PlaybackStates};

/// All known server→client push messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushMessage {
    /// Full playback state, keyed by studio.
    #[serde(rename = "playback_update")]
    PlaybackUpdate(PlaybackStates),
}

/// Parse a push-channel text frame.
///
/// Returns `Err` for malformed JSON or unknown `type` values. Callers
/// should log those and continue. Playback payloads come back
/// normalized (studio filled in, derived track fields computed).
pub fn parse_message(text: &str) -> Result<PushMessage, serde_json::Error> {
    let mut message: PushMessage = serde_json::from_str(text)?;
    match &mut message {
        PushMessage::PlaybackUpdate(states) => normalize_playback(states),
    }
    Ok(message)
}

/// The `type` field of a frame, if it has one. Used to log unknown
/// message kinds without dumping the whole payload.
pub fn message_type(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value.get("type")?.as_str().map(str::to_string)
}
