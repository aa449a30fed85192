//! Typed REST wrappers for the radio automation backend.
//!
//! Read methods degrade instead of failing where the UI must keep
//! rendering: a 401, a transport failure or an undecodable body all yield
//! the empty/default value. Any other non-2xx status is an
//! [`ApiError::Status`]. Write methods never degrade a failure status,
//! but a 2xx write whose body is not the expected entity still succeeds
//! and returns `None`.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use onair_core::models::{
    normalize_playback, AudioTrack, FolderUpdate, InstantPlayer, InstantPlayerAssignment,
    MediaFolder, NewFolder, NewPlaylist, NewPlaylistItem, NewScheduledEvent, NewTrackUpload,
    PlaybackStates, Playlist, PlaylistItem, PlaylistUpdate, ScheduledEvent, ScheduledEventUpdate,
    TrackFilter, TrackUpdate,
};
use onair_core::types::{DbId, PlaybackAction, Studio};
use onair_core::CoreError;

use crate::folder_compat::{self, DEFAULT_LEGACY_FOLDER_IDS};
use crate::transport::{ApiRequest, MultipartUpload, Transport, TransportError};

/// Path prefix shared by every endpoint.
const BASE: &str = "/api/radio";

/// Errors from the REST layer. `resource` names the collection involved,
/// e.g. `"tracks"`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{resource} request failed: {source}")]
    Transport {
        resource: &'static str,
        #[source]
        source: TransportError,
    },

    /// The backend returned a non-2xx status.
    #[error("{resource} request returned HTTP {status}")]
    Status {
        resource: &'static str,
        status: u16,
        /// Backend-supplied error text, when present.
        message: Option<String>,
    },

    #[error("Failed to encode {resource} request: {source}")]
    Encode {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {resource} request: {source}")]
    Invalid {
        resource: &'static str,
        #[source]
        source: CoreError,
    },
}

impl ApiError {
    pub fn resource(&self) -> &'static str {
        match self {
            ApiError::Transport { resource, .. }
            | ApiError::Status { resource, .. }
            | ApiError::Encode { resource, .. }
            | ApiError::Invalid { resource, .. } => resource,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for showing to a user: the backend's own message
    /// when it sent one, or a validation reason.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Invalid { source, .. } => Some(source.to_string()),
            _ => None,
        }
    }
}

/// REST client for one backend.
///
/// Cheap to clone; all clones share the underlying [`Transport`].
#[derive(Clone)]
pub struct RadioApi {
    transport: Arc<dyn Transport>,
    legacy_folder_ids: Arc<[DbId]>,
}

impl RadioApi {
    /// API over `transport`, with the default legacy folder ids.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            legacy_folder_ids: Arc::from(DEFAULT_LEGACY_FOLDER_IDS.as_slice()),
        }
    }

    /// Override the folder ids that get the filter fallback in
    /// [`list_tracks`](Self::list_tracks).
    pub fn with_legacy_folder_ids(mut self, ids: Vec<DbId>) -> Self {
        self.legacy_folder_ids = Arc::from(ids);
        self
    }

    /// Folder ids that get the filter fallback.
    pub fn legacy_folder_ids(&self) -> &[DbId] {
        &self.legacy_folder_ids
    }

    // ---- reads ----

    /// `GET /tracks`, optionally filtered by folder and search text.
    ///
    /// Folder lookups go through [`folder_compat::fetch_folder_tracks`].
    pub async fn list_tracks(&self, filter: &TrackFilter) -> Result<Vec<AudioTrack>, ApiError> {
        match filter.folder_id {
            Some(folder_id) => {
                folder_compat::fetch_folder_tracks(
                    self,
                    folder_id,
                    filter.search.as_deref(),
                    &self.legacy_folder_ids,
                )
                .await
            }
            None => {
                let mut params = Vec::new();
                if let Some(search) = &filter.search {
                    params.push(("search", search.clone()));
                }
                self.query_tracks(&params).await
            }
        }
    }

    /// Raw `GET /tracks` with exactly the given query parameters.
    pub(crate) async fn query_tracks(
        &self,
        params: &[(&str, String)],
    ) -> Result<Vec<AudioTrack>, ApiError> {
        let mut request = ApiRequest::get(format!("{BASE}/tracks"));
        for (name, value) in params {
            request = request.with_query(*name, value);
        }
        let tracks: Vec<AudioTrack> = self.read("tracks", request).await?;
        Ok(tracks.into_iter().map(AudioTrack::with_derived_fields).collect())
    }

    /// `GET /folders`
    pub async fn list_folders(&self) -> Result<Vec<MediaFolder>, ApiError> {
        self.read("folders", ApiRequest::get(format!("{BASE}/folders")))
            .await
    }

    /// `GET /playlists`
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>, ApiError> {
        self.read("playlists", ApiRequest::get(format!("{BASE}/playlists")))
            .await
    }

    /// `GET /playlists/:id`. `None` when degraded or the body is `null`.
    pub async fn get_playlist(&self, id: DbId) -> Result<Option<Playlist>, ApiError> {
        self.read("playlist", ApiRequest::get(format!("{BASE}/playlists/{id}")))
            .await
    }

    /// `GET /playlists/:id/items`, sorted by position.
    pub async fn list_playlist_items(
        &self,
        playlist_id: DbId,
    ) -> Result<Vec<PlaylistItem>, ApiError> {
        let mut items: Vec<PlaylistItem> = self
            .read(
                "playlist items",
                ApiRequest::get(format!("{BASE}/playlists/{playlist_id}/items")),
            )
            .await?;
        items.sort_by_key(|item| item.position);
        items.iter_mut().for_each(PlaylistItem::apply_derived_fields);
        Ok(items)
    }

    /// `GET /instant-players`, narrowed by `?studio=` when given.
    pub async fn list_instant_players(
        &self,
        studio: Option<Studio>,
    ) -> Result<Vec<InstantPlayer>, ApiError> {
        let mut request = ApiRequest::get(format!("{BASE}/instant-players"));
        if let Some(studio) = studio {
            request = request.with_query("studio", studio);
        }
        self.read("instant players", request).await
    }

    /// `GET /scheduled-events`
    pub async fn list_scheduled_events(&self) -> Result<Vec<ScheduledEvent>, ApiError> {
        self.read(
            "scheduled events",
            ApiRequest::get(format!("{BASE}/scheduled-events")),
        )
        .await
    }

    /// `GET /upcoming-events?studio=&limit=`
    pub async fn list_upcoming_events(
        &self,
        studio: Studio,
        limit: u32,
    ) -> Result<Vec<ScheduledEvent>, ApiError> {
        let request = ApiRequest::get(format!("{BASE}/upcoming-events"))
            .with_query("studio", studio)
            .with_query("limit", limit);
        self.read("upcoming events", request).await
    }

    /// `GET /playback`, normalized so every state carries its studio.
    pub async fn get_playback(&self) -> Result<PlaybackStates, ApiError> {
        let mut states: PlaybackStates = self
            .read("playback", ApiRequest::get(format!("{BASE}/playback")))
            .await?;
        normalize_playback(&mut states);
        Ok(states)
    }

    // ---- writes ----
    //
    // A write is done once the backend answers 2xx. Methods that return an
    // entity give `None` when the response body is empty or does not
    // decode as that entity.

    /// `POST /tracks/upload` as multipart, file under `file`.
    pub async fn upload_track(
        &self,
        upload: NewTrackUpload,
    ) -> Result<Option<AudioTrack>, ApiError> {
        const RESOURCE: &str = "track upload";
        upload.validate().map_err(|source| ApiError::Invalid {
            resource: RESOURCE,
            source,
        })?;

        let fields = upload
            .form_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let request =
            ApiRequest::post(format!("{BASE}/tracks/upload")).with_multipart(MultipartUpload {
                file_field: "file".into(),
                file_name: upload.file_name,
                content_type: upload.content_type,
                bytes: upload.bytes,
                fields,
            });

        let track: Option<AudioTrack> = self.write(RESOURCE, request).await?;
        Ok(track.map(AudioTrack::with_derived_fields))
    }

    /// `PATCH /tracks/:id`
    pub async fn update_track(
        &self,
        id: DbId,
        update: &TrackUpdate,
    ) -> Result<Option<AudioTrack>, ApiError> {
        let request = ApiRequest::patch(format!("{BASE}/tracks/{id}"));
        let request = Self::json_body("track", request, update)?;
        let track: Option<AudioTrack> = self.write("track", request).await?;
        Ok(track.map(AudioTrack::with_derived_fields))
    }

    /// `DELETE /tracks/:id`
    pub async fn delete_track(&self, id: DbId) -> Result<(), ApiError> {
        self.write_unit("track", ApiRequest::delete(format!("{BASE}/tracks/{id}")))
            .await
    }

    /// `POST /playlists`
    pub async fn create_playlist(
        &self,
        playlist: &NewPlaylist,
    ) -> Result<Option<Playlist>, ApiError> {
        let request = ApiRequest::post(format!("{BASE}/playlists"));
        let request = Self::json_body("playlist", request, playlist)?;
        self.write("playlist", request).await
    }

    /// `PATCH /playlists/:id`
    pub async fn update_playlist(
        &self,
        id: DbId,
        update: &PlaylistUpdate,
    ) -> Result<Option<Playlist>, ApiError> {
        let request = ApiRequest::patch(format!("{BASE}/playlists/{id}"));
        let request = Self::json_body("playlist", request, update)?;
        self.write("playlist", request).await
    }

    /// `DELETE /playlists/:id`
    pub async fn delete_playlist(&self, id: DbId) -> Result<(), ApiError> {
        self.write_unit("playlist", ApiRequest::delete(format!("{BASE}/playlists/{id}")))
            .await
    }

    /// `POST /playlists/:id/items`
    pub async fn add_playlist_item(
        &self,
        playlist_id: DbId,
        item: &NewPlaylistItem,
    ) -> Result<Option<PlaylistItem>, ApiError> {
        let request = ApiRequest::post(format!("{BASE}/playlists/{playlist_id}/items"));
        let request = Self::json_body("playlist item", request, item)?;
        let created: Option<PlaylistItem> = self.write("playlist item", request).await?;
        Ok(created.map(|mut item| {
            item.apply_derived_fields();
            item
        }))
    }

    /// `DELETE /playlists/:id/items/:itemId`
    pub async fn remove_playlist_item(
        &self,
        playlist_id: DbId,
        item_id: DbId,
    ) -> Result<(), ApiError> {
        self.write_unit(
            "playlist item",
            ApiRequest::delete(format!("{BASE}/playlists/{playlist_id}/items/{item_id}")),
        )
        .await
    }

    /// `POST /playlists/:id/activate` with `{"studio": ...}`.
    pub async fn activate_playlist(&self, id: DbId, studio: Studio) -> Result<(), ApiError> {
        let request = Self::json_body(
            "playlist activation",
            ApiRequest::post(format!("{BASE}/playlists/{id}/activate")),
            &serde_json::json!({ "studio": studio }),
        )?;
        self.write_unit("playlist activation", request).await
    }

    /// `POST /folders`
    pub async fn create_folder(&self, folder: &NewFolder) -> Result<Option<MediaFolder>, ApiError> {
        let request = ApiRequest::post(format!("{BASE}/folders"));
        let request = Self::json_body("folder", request, folder)?;
        self.write("folder", request).await
    }

    /// `PATCH /folders/:id`
    pub async fn update_folder(
        &self,
        id: DbId,
        update: &FolderUpdate,
    ) -> Result<Option<MediaFolder>, ApiError> {
        let request = ApiRequest::patch(format!("{BASE}/folders/{id}"));
        let request = Self::json_body("folder", request, update)?;
        self.write("folder", request).await
    }

    /// `DELETE /folders/:id`
    pub async fn delete_folder(&self, id: DbId) -> Result<(), ApiError> {
        self.write_unit("folder", ApiRequest::delete(format!("{BASE}/folders/{id}")))
            .await
    }

    /// `POST /instant-players`
    pub async fn assign_instant_player(
        &self,
        assignment: &InstantPlayerAssignment,
    ) -> Result<Option<InstantPlayer>, ApiError> {
        let request = ApiRequest::post(format!("{BASE}/instant-players"));
        let request = Self::json_body("instant player", request, assignment)?;
        self.write("instant player", request).await
    }

    /// `DELETE /instant-players/:keyNumber/:studio`
    pub async fn clear_instant_player(
        &self,
        key_number: i32,
        studio: Studio,
    ) -> Result<(), ApiError> {
        self.write_unit(
            "instant player",
            ApiRequest::delete(format!("{BASE}/instant-players/{key_number}/{studio}")),
        )
        .await
    }

    /// `POST /instant-players/:keyNumber/:studio/play`
    pub async fn play_instant_player(
        &self,
        key_number: i32,
        studio: Studio,
    ) -> Result<(), ApiError> {
        self.write_unit(
            "instant player",
            ApiRequest::post(format!("{BASE}/instant-players/{key_number}/{studio}/play")),
        )
        .await
    }

    /// `POST /scheduled-events`
    pub async fn create_scheduled_event(
        &self,
        event: &NewScheduledEvent,
    ) -> Result<Option<ScheduledEvent>, ApiError> {
        let request = ApiRequest::post(format!("{BASE}/scheduled-events"));
        let request = Self::json_body("scheduled event", request, event)?;
        self.write("scheduled event", request).await
    }

    /// `PATCH /scheduled-events/:id`
    pub async fn update_scheduled_event(
        &self,
        id: DbId,
        update: &ScheduledEventUpdate,
    ) -> Result<Option<ScheduledEvent>, ApiError> {
        let request = ApiRequest::patch(format!("{BASE}/scheduled-events/{id}"));
        let request = Self::json_body("scheduled event", request, update)?;
        self.write("scheduled event", request).await
    }

    /// `DELETE /scheduled-events/:id`
    pub async fn delete_scheduled_event(&self, id: DbId) -> Result<(), ApiError> {
        self.write_unit(
            "scheduled event",
            ApiRequest::delete(format!("{BASE}/scheduled-events/{id}")),
        )
        .await
    }

    /// `POST /playback/:action` with `{"studio": ...}`.
    pub async fn control_playback(
        &self,
        action: PlaybackAction,
        studio: Studio,
    ) -> Result<(), ApiError> {
        let request = Self::json_body(
            "playback",
            ApiRequest::post(format!("{BASE}/playback/{action}")),
            &serde_json::json!({ "studio": studio }),
        )?;
        self.write_unit("playback", request).await
    }

    // ---- private helpers ----

    /// Send a read request, substituting `T::default()` for a 401, a
    /// transport failure, or a body that does not decode.
    async fn read<T>(&self, resource: &'static str, request: ApiRequest) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let url = request.url_key();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(resource, url = %url, error = %e, "Read failed, using empty result");
                return Ok(T::default());
            }
        };

        if response.is_unauthorized() {
            tracing::debug!(resource, url = %url, "Unauthenticated read, using empty result");
            return Ok(T::default());
        }

        if !response.is_success() {
            return Err(ApiError::Status {
                resource,
                status: response.status,
                message: response.error_message(),
            });
        }

        match response.json::<Option<T>>() {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(e) => {
                tracing::warn!(
                    resource,
                    url = %url,
                    error = %e,
                    "Malformed response, using empty result",
                );
                Ok(T::default())
            }
        }
    }

    /// Send a write request and decode the response body.
    ///
    /// Only the status decides success. An empty body, or one that is not a
    /// `T`, is logged and comes back as `None`.
    async fn write<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        request: ApiRequest,
    ) -> Result<Option<T>, ApiError> {
        let url = request.url_key();
        let response = self.send_checked(resource, request).await?;
        match response.json::<Option<T>>() {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(
                    resource,
                    url = %url,
                    error = %e,
                    "Write accepted, response body not decoded",
                );
                Ok(None)
            }
        }
    }

    /// Send a write request, ignoring any response body.
    async fn write_unit(
        &self,
        resource: &'static str,
        request: ApiRequest,
    ) -> Result<(), ApiError> {
        self.send_checked(resource, request).await?;
        Ok(())
    }

    async fn send_checked(
        &self,
        resource: &'static str,
        request: ApiRequest,
    ) -> Result<crate::transport::ApiResponse, ApiError> {
        let url = request.url_key();
        let method = request.method.clone();
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| ApiError::Transport { resource, source })?;

        if !response.is_success() {
            tracing::warn!(
                resource,
                method = %method,
                url = %url,
                status = response.status,
                "Write rejected",
            );
            return Err(ApiError::Status {
                resource,
                status: response.status,
                message: response.error_message(),
            });
        }
        Ok(response)
    }

    fn json_body<T: serde::Serialize>(
        resource: &'static str,
        request: ApiRequest,
        body: &T,
    ) -> Result<ApiRequest, ApiError> {
        request
            .with_json(body)
            .map_err(|source| ApiError::Encode { resource, source })
    }
}
