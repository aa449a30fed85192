use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::de::{non_negative_seconds, null_as_default};
use crate::models::track::AudioTrack;
use crate::types::Studio;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Transport state of one studio.
///
/// Refreshed both by polling and by push updates. There is no sequence
/// token, so whichever arrives last is what the cache holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Filled from the map key when absent from the payload.
    #[serde(default)]
    pub studio: Option<Studio>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PlaybackStatus,
    #[serde(default)]
    pub current_track: Option<AudioTrack>,
    /// Seconds into the current track.
    #[serde(default, deserialize_with = "non_negative_seconds")]
    pub current_position: f64,
    #[serde(default)]
    pub next_track: Option<AudioTrack>,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

/// Playback state keyed by studio. Shape of both `GET /api/radio/playback`
/// and the `playback_update` push payload.
pub type PlaybackStates = BTreeMap<Studio, PlaybackState>;

/// Fill each state's studio from its key and compute derived track fields.
pub fn normalize_playback(states: &mut PlaybackStates) {
    for (studio, state) in states.iter_mut() {
        state.studio = Some(*studio);
        if let Some(track) = state.current_track.as_mut() {
            track.apply_derived_fields();
        }
        if let Some(track) = state.next_track.as_mut() {
            track.apply_derived_fields();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_by_studio_payload_and_normalizes() {
        let mut states: PlaybackStates = serde_json::from_value(serde_json::json!({
            "A": {
                "status": "playing",
                "currentPosition": 12.5,
                "currentTrack": {"id": 1, "title": "Opener", "duration": 190}
            },
            "B": {"status": "stopped"}
        }))
        .unwrap();

        normalize_playback(&mut states);

        let a = &states[&Studio::A];
        assert_eq!(a.studio, Some(Studio::A));
        assert!(a.is_playing());
        assert_eq!(a.current_position, 12.5);
        assert_eq!(
            a.current_track
                .as_ref()
                .and_then(|t| t.duration_formatted.as_deref()),
            Some("3:10")
        );
        assert_eq!(states[&Studio::B].status, PlaybackStatus::Stopped);
        assert_eq!(states[&Studio::B].studio, Some(Studio::B));
    }

    #[test]
    fn null_fields_on_one_studio_keep_both_studios() {
        let mut states: PlaybackStates = serde_json::from_value(serde_json::json!({
            "A": {"status": "playing", "currentPosition": 10.0},
            "B": {"status": null, "currentPosition": null, "currentTrack": null}
        }))
        .unwrap();
        normalize_playback(&mut states);

        assert_eq!(states.len(), 2);
        assert_eq!(states[&Studio::A].current_position, 10.0);
        let b = &states[&Studio::B];
        assert_eq!(b.status, PlaybackStatus::Stopped);
        assert_eq!(b.current_position, 0.0);
        assert!(b.current_track.is_none());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let result: Result<PlaybackStates, _> =
            serde_json::from_value(serde_json::json!({"A": {"status": "rewinding"}}));
        assert!(result.is_err());
    }
}
