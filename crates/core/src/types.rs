use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Backend primary keys are integer serials.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Studio
// ---------------------------------------------------------------------------

/// A named on-air production chain with its own playback state and
/// active playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Studio {
    A,
    B,
}

impl Studio {
    pub const ALL: [Studio; 2] = [Studio::A, Studio::B];

    /// Wire representation, also used as a URL path segment.
    pub fn as_str(self) -> &'static str {
        match self {
            Studio::A => "A",
            Studio::B => "B",
        }
    }
}

impl fmt::Display for Studio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Studio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Studio::A),
            "B" | "b" => Ok(Studio::B),
            other => Err(CoreError::UnknownStudio(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackAction
// ---------------------------------------------------------------------------

/// Transport commands accepted by `POST /api/radio/playback/:action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Play,
    Pause,
    Stop,
    Next,
}

impl PlaybackAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackAction::Play => "play",
            PlaybackAction::Pause => "pause",
            PlaybackAction::Stop => "stop",
            PlaybackAction::Next => "next",
        }
    }
}

impl fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(PlaybackAction::Play),
            "pause" => Ok(PlaybackAction::Pause),
            "stop" => Ok(PlaybackAction::Stop),
            "next" => Ok(PlaybackAction::Next),
            _ => Err(CoreError::UnknownPlaybackAction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn studio_parses_either_case() {
        assert_eq!("a".parse::<Studio>().unwrap(), Studio::A);
        assert_eq!(" B ".parse::<Studio>().unwrap(), Studio::B);
    }

    #[test]
    fn unknown_studio_is_rejected() {
        let err = "C".parse::<Studio>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownStudio(ref s) if s == "C"));
    }

    #[test]
    fn studio_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Studio::B).unwrap(), r#""B""#);
    }

    #[test]
    fn playback_action_round_trips_through_str() {
        for action in [
            PlaybackAction::Play,
            PlaybackAction::Pause,
            PlaybackAction::Stop,
            PlaybackAction::Next,
        ] {
            assert_eq!(action.as_str().parse::<PlaybackAction>().unwrap(), action);
        }
        assert!("rewind".parse::<PlaybackAction>().is_err());
    }
}
