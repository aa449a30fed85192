//! Backend entities as held by the client cache.

mod de;
pub mod folder;
pub mod instant_player;
pub mod playback;
pub mod playlist;
pub mod schedule;
pub mod track;

pub use folder::{FolderUpdate, MediaFolder, NewFolder};
pub use instant_player::{InstantPlayer, InstantPlayerAssignment};
pub use playback::{normalize_playback, PlaybackState, PlaybackStates, PlaybackStatus};
pub use playlist::{NewPlaylist, NewPlaylistItem, Playlist, PlaylistItem, PlaylistUpdate};
pub use schedule::{NewScheduledEvent, ScheduledEvent, ScheduledEventUpdate};
pub use track::{AudioTrack, NewTrackUpload, TrackFilter, TrackUpdate};
