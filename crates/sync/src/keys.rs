//! Semantic cache keys.
//!
//! A [`QueryKey`] is a path of segments, most general first. Invalidating
//! a key also invalidates every key it is a prefix of, so
//! [`QueryKey::tracks`] ("all tracks") covers every filtered track query
//! and [`QueryKey::playlists`] covers every playlist's items.

use std::fmt;

use onair_core::models::TrackFilter;
use onair_core::types::{DbId, Studio};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    segments: Vec<String>,
}

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when `self` equals `other` or is a leading prefix of it.
    pub fn is_prefix_of(&self, other: &QueryKey) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    // ---- well-known keys ----

    /// Every track query, filtered or not.
    pub fn tracks() -> Self {
        Self::new(["tracks"])
    }

    /// Track query for a specific filter. The unfiltered list lives under
    /// `tracks/all` so that it is distinct from the `tracks` prefix.
    pub fn tracks_filtered(filter: &TrackFilter) -> Self {
        let mut key = match filter.folder_id {
            Some(folder_id) => Self::tracks().child("folder").child(folder_id.to_string()),
            None => Self::tracks().child("all"),
        };
        if let Some(search) = &filter.search {
            key = key.child("search").child(search.clone());
        }
        key
    }

    pub fn folders() -> Self {
        Self::new(["folders"])
    }

    /// Every playlist query, including every playlist's items.
    pub fn playlists() -> Self {
        Self::new(["playlists"])
    }

    /// The playlist collection itself.
    pub fn playlist_list() -> Self {
        Self::playlists().child("all")
    }

    pub fn playlist_items(playlist_id: DbId) -> Self {
        Self::playlists().child(playlist_id.to_string()).child("items")
    }

    /// Every instant-player query.
    pub fn instant_players() -> Self {
        Self::new(["instant-players"])
    }

    pub fn instant_players_for(studio: Option<Studio>) -> Self {
        match studio {
            Some(studio) => Self::instant_players().child(studio.as_str()),
            None => Self::instant_players().child("all"),
        }
    }

    pub fn scheduled_events() -> Self {
        Self::new(["scheduled-events"])
    }

    /// Every upcoming-events query.
    pub fn upcoming_events() -> Self {
        Self::new(["upcoming-events"])
    }

    pub fn upcoming_events_for(studio: Studio, limit: u32) -> Self {
        Self::upcoming_events()
            .child(studio.as_str())
            .child(limit.to_string())
    }

    pub fn playback() -> Self {
        Self::new(["playback"])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}
