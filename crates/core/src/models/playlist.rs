use serde::{Deserialize, Serialize};

use crate::models::track::AudioTrack;
use crate::types::{DbId, Studio};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: DbId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub studio: Option<Studio>,
}

/// The active playlist for `studio`, if the backend reports one.
///
/// The client does not enforce a single active playlist per studio; when
/// several are flagged the first in backend order wins.
pub fn active_for_studio(playlists: &[Playlist], studio: Studio) -> Option<&Playlist> {
    playlists
        .iter()
        .find(|p| p.is_active && p.studio == Some(studio))
}

/// An entry in a playlist. `position` defines playback order and is
/// only ever changed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub id: DbId,
    pub playlist_id: DbId,
    pub track_id: DbId,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub track: Option<AudioTrack>,
}

impl PlaylistItem {
    pub fn apply_derived_fields(&mut self) {
        if let Some(track) = self.track.as_mut() {
            track.apply_derived_fields();
        }
    }
}

/// Position for an item appended after `items`.
pub fn next_position(items: &[PlaylistItem]) -> i32 {
    items.iter().map(|i| i.position + 1).max().unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlaylist {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<Studio>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studio: Option<Studio>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlaylistItem {
    pub track_id: DbId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}
