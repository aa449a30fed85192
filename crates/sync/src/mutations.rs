//! Write operations against the backend.
//!
//! Every action follows the same contract: on success publish a success
//! [`Notification`] and invalidate the cache keys the write affects; on
//! failure publish an error notification carrying the backend's message
//! and leave the cache untouched. Nothing is retried.

use std::future::Future;
use std::sync::Arc;

use onair_client::{ApiError, RadioApi};
use onair_core::models::{
    AudioTrack, FolderUpdate, InstantPlayer, InstantPlayerAssignment, MediaFolder, NewFolder,
    NewPlaylist, NewPlaylistItem, NewScheduledEvent, NewTrackUpload, Playlist, PlaylistItem,
    PlaylistUpdate, ScheduledEvent, ScheduledEventUpdate, TrackUpdate,
};
use onair_core::types::{DbId, PlaybackAction, Studio};
use onair_events::{Notification, NotificationBus};

use crate::cache::QueryCache;
use crate::keys::QueryKey;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The backend rejected the write or could not be reached.
    #[error("Failed to {action}: {source}")]
    Failed {
        action: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("No active playlist for studio {0}")]
    NoActivePlaylist(Studio),

    #[error("No track selected")]
    NoTrackSelected,
}

impl ActionError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Failed { action, source } => source
                .user_message()
                .unwrap_or_else(|| format!("Failed to {action}")),
            other => other.to_string(),
        }
    }
}

/// Runs backend writes and keeps the cache and the user informed.
#[derive(Clone)]
pub struct MutationExecutor {
    api: RadioApi,
    cache: QueryCache,
    notifications: Arc<NotificationBus>,
}

impl MutationExecutor {
    pub fn new(api: RadioApi, cache: QueryCache, notifications: Arc<NotificationBus>) -> Self {
        Self {
            api,
            cache,
            notifications,
        }
    }

    // ---- tracks ----
    //
    // Writes that return an entity give `Ok(None)` when the backend accepted
    // the write but its reply was not that entity. The write still counts as
    // done: the user is notified and the keys are invalidated.

    /// Upload an audio file. Invalidates tracks and folders.
    pub async fn upload_track(
        &self,
        upload: NewTrackUpload,
    ) -> Result<Option<AudioTrack>, ActionError> {
        self.run(
            "upload track",
            "Track uploaded",
            &[QueryKey::tracks(), QueryKey::folders()],
            self.api.upload_track(upload),
        )
        .await
    }

    /// Invalidates tracks and playlists, whose items embed the track.
    pub async fn update_track(
        &self,
        id: DbId,
        update: &TrackUpdate,
    ) -> Result<Option<AudioTrack>, ActionError> {
        self.run(
            "update track",
            "Track updated",
            &[QueryKey::tracks(), QueryKey::playlists()],
            self.api.update_track(id, update),
        )
        .await
    }

    /// Playlists and instant players may reference the deleted track, so
    /// they are refreshed too.
    pub async fn delete_track(&self, id: DbId) -> Result<(), ActionError> {
        self.run(
            "delete track",
            "Track deleted",
            &[
                QueryKey::tracks(),
                QueryKey::playlists(),
                QueryKey::instant_players(),
            ],
            self.api.delete_track(id),
        )
        .await
    }

    // ---- playlists ----

    /// Invalidates playlists.
    pub async fn create_playlist(
        &self,
        playlist: &NewPlaylist,
    ) -> Result<Option<Playlist>, ActionError> {
        self.run(
            "create playlist",
            "Playlist created",
            &[QueryKey::playlists()],
            self.api.create_playlist(playlist),
        )
        .await
    }

    /// Invalidates playlists.
    pub async fn update_playlist(
        &self,
        id: DbId,
        update: &PlaylistUpdate,
    ) -> Result<Option<Playlist>, ActionError> {
        self.run(
            "update playlist",
            "Playlist updated",
            &[QueryKey::playlists()],
            self.api.update_playlist(id, update),
        )
        .await
    }

    /// Invalidates playlists.
    pub async fn delete_playlist(&self, id: DbId) -> Result<(), ActionError> {
        self.run(
            "delete playlist",
            "Playlist deleted",
            &[QueryKey::playlists()],
            self.api.delete_playlist(id),
        )
        .await
    }

    /// Invalidates playlists, which covers the items of every playlist.
    pub async fn add_playlist_item(
        &self,
        playlist_id: DbId,
        item: &NewPlaylistItem,
    ) -> Result<Option<PlaylistItem>, ActionError> {
        self.run(
            "add track to playlist",
            "Track added to playlist",
            &[QueryKey::playlists()],
            self.api.add_playlist_item(playlist_id, item),
        )
        .await
    }

    /// Invalidates playlists.
    pub async fn remove_playlist_item(
        &self,
        playlist_id: DbId,
        item_id: DbId,
    ) -> Result<(), ActionError> {
        self.run(
            "remove track from playlist",
            "Track removed from playlist",
            &[QueryKey::playlists()],
            self.api.remove_playlist_item(playlist_id, item_id),
        )
        .await
    }

    /// Activation changes what the studio plays next, so playback is
    /// refreshed along with the playlists.
    pub async fn activate_playlist(&self, id: DbId, studio: Studio) -> Result<(), ActionError> {
        self.run(
            "activate playlist",
            "Playlist activated",
            &[QueryKey::playlists(), QueryKey::playback()],
            self.api.activate_playlist(id, studio),
        )
        .await
    }

    // ---- folders ----

    /// Invalidates folders.
    pub async fn create_folder(
        &self,
        folder: &NewFolder,
    ) -> Result<Option<MediaFolder>, ActionError> {
        self.run(
            "create folder",
            "Folder created",
            &[QueryKey::folders()],
            self.api.create_folder(folder),
        )
        .await
    }

    /// Invalidates folders.
    pub async fn update_folder(
        &self,
        id: DbId,
        update: &FolderUpdate,
    ) -> Result<Option<MediaFolder>, ActionError> {
        self.run(
            "update folder",
            "Folder updated",
            &[QueryKey::folders()],
            self.api.update_folder(id, update),
        )
        .await
    }

    /// Invalidates folders and tracks, since the folder's tracks move.
    pub async fn delete_folder(&self, id: DbId) -> Result<(), ActionError> {
        self.run(
            "delete folder",
            "Folder deleted",
            &[QueryKey::folders(), QueryKey::tracks()],
            self.api.delete_folder(id),
        )
        .await
    }

    // ---- instant players ----

    /// Invalidates instant players.
    pub async fn assign_instant_player(
        &self,
        assignment: &InstantPlayerAssignment,
    ) -> Result<Option<InstantPlayer>, ActionError> {
        self.run(
            "assign instant player",
            "Instant player assigned",
            &[QueryKey::instant_players()],
            self.api.assign_instant_player(assignment),
        )
        .await
    }

    /// Invalidates instant players.
    pub async fn clear_instant_player(
        &self,
        key_number: i32,
        studio: Studio,
    ) -> Result<(), ActionError> {
        self.run(
            "clear instant player",
            "Instant player cleared",
            &[QueryKey::instant_players()],
            self.api.clear_instant_player(key_number, studio),
        )
        .await
    }

    /// Invalidates playback.
    pub async fn play_instant_player(
        &self,
        key_number: i32,
        studio: Studio,
    ) -> Result<(), ActionError> {
        self.run(
            "play instant player",
            "Instant player started",
            &[QueryKey::playback()],
            self.api.play_instant_player(key_number, studio),
        )
        .await
    }

    // ---- scheduled events ----

    /// Invalidates scheduled and upcoming events.
    pub async fn create_scheduled_event(
        &self,
        event: &NewScheduledEvent,
    ) -> Result<Option<ScheduledEvent>, ActionError> {
        self.run(
            "create scheduled event",
            "Event scheduled",
            &[QueryKey::scheduled_events(), QueryKey::upcoming_events()],
            self.api.create_scheduled_event(event),
        )
        .await
    }

    /// Invalidates scheduled and upcoming events.
    pub async fn update_scheduled_event(
        &self,
        id: DbId,
        update: &ScheduledEventUpdate,
    ) -> Result<Option<ScheduledEvent>, ActionError> {
        self.run(
            "update scheduled event",
            "Scheduled event updated",
            &[QueryKey::scheduled_events(), QueryKey::upcoming_events()],
            self.api.update_scheduled_event(id, update),
        )
        .await
    }

    /// Invalidates scheduled and upcoming events.
    pub async fn delete_scheduled_event(&self, id: DbId) -> Result<(), ActionError> {
        self.run(
            "delete scheduled event",
            "Scheduled event deleted",
            &[QueryKey::scheduled_events(), QueryKey::upcoming_events()],
            self.api.delete_scheduled_event(id),
        )
        .await
    }

    // ---- playback ----

    /// Invalidates playback.
    pub async fn control_playback(
        &self,
        action: PlaybackAction,
        studio: Studio,
    ) -> Result<(), ActionError> {
        self.run(
            "control playback",
            format!("Playback {action} sent to studio {studio}"),
            &[QueryKey::playback()],
            self.api.control_playback(action, studio),
        )
        .await
    }

    // ---- private helpers ----

    /// Await `write`; a 2xx answer counts as success whatever its body.
    async fn run<T, Fut>(
        &self,
        action: &'static str,
        success_title: impl Into<String>,
        invalidates: &[QueryKey],
        write: Fut,
    ) -> Result<T, ActionError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match write.await {
            Ok(value) => {
                self.notifications.publish(Notification::success(success_title));
                for key in invalidates {
                    self.cache.invalidate(key);
                }
                tracing::info!(action, "Action succeeded");
                Ok(value)
            }
            Err(source) => {
                let error = ActionError::Failed { action, source };
                tracing::warn!(action, error = %error, "Action failed");
                self.publish_failure(action, &error);
                Err(error)
            }
        }
    }

    /// Publish an error notification for a failure detected before any
    /// backend call.
    pub(crate) fn reject(&self, action: &'static str, error: ActionError) -> ActionError {
        tracing::warn!(action, error = %error, "Action rejected");
        self.publish_failure(action, &error);
        error
    }

    fn publish_failure(&self, action: &'static str, error: &ActionError) {
        let title = format!("Failed to {action}");
        self.notifications
            .publish(Notification::error(title, error.user_message()));
    }
}
