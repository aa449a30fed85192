//! Per-session facade.
//!
//! [`AutomationContext`] is created once per session and passed to every
//! consumer. It owns the cache, the mutation executor, the notification
//! bus and the background tasks (push listener, playback poller), and
//! tears all of them down in [`shutdown`](AutomationContext::shutdown).

use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use onair_client::client::LiveClient;
use onair_client::reconnect::ConnectionState;
use onair_client::{ApiError, HttpTransport, RadioApi, Transport, TransportError};
use onair_core::models::playlist::{active_for_studio, next_position};
use onair_core::models::{
    AudioTrack, FolderUpdate, InstantPlayer, InstantPlayerAssignment, MediaFolder, NewFolder,
    NewPlaylist, NewPlaylistItem, NewScheduledEvent, NewTrackUpload, PlaybackStates, Playlist,
    PlaylistItem, PlaylistUpdate, ScheduledEvent, ScheduledEventUpdate, TrackFilter, TrackUpdate,
};
use onair_core::types::{DbId, PlaybackAction, Studio};
use onair_events::{Notification, NotificationBus};

use crate::cache::{query_fn, QueryCache, QueryObserver};
use crate::config::SessionConfig;
use crate::keys::QueryKey;
use crate::listener::{self, ListenerOptions};
use crate::mutations::{ActionError, MutationExecutor};
use crate::poller;

/// How long [`AutomationContext::shutdown`] waits for each background task.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AutomationContext {
    api: RadioApi,
    cache: QueryCache,
    mutations: MutationExecutor,
    notifications: Arc<NotificationBus>,
    selected_track: watch::Sender<Option<AudioTrack>>,
    listener_state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AutomationContext {
    /// Start a session against the backend described by `config`, using
    /// the reqwest transport.
    pub fn start(config: SessionConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.api_url.clone(), config.request_timeout)?
            .with_bearer_token(config.api_token.clone());
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Start a session over an injected transport. Spawns the push
    /// listener and the playback poller, so it must be called within a
    /// Tokio runtime.
    pub fn with_transport(config: SessionConfig, transport: Arc<dyn Transport>) -> Self {
        let cancel = CancellationToken::new();
        let api =
            RadioApi::new(transport).with_legacy_folder_ids(config.legacy_folder_ids.clone());
        let cache = QueryCache::new(cancel.clone());
        let notifications = Arc::new(NotificationBus::default());
        let mutations =
            MutationExecutor::new(api.clone(), cache.clone(), Arc::clone(&notifications));

        let client =
            LiveClient::new(config.ws_url.clone()).with_connect_timeout(config.connect_timeout);
        let listener = listener::spawn(
            client,
            cache.clone(),
            ListenerOptions {
                reconnect: config.reconnect,
                backoff: config.reconnect_backoff.clone(),
            },
            cancel.child_token(),
        );

        let mut tasks = vec![listener.task];
        if let Some(task) = poller::spawn(
            cache.clone(),
            config.playback_poll_interval,
            cancel.child_token(),
        ) {
            tasks.push(task);
        }

        tracing::info!(
            api_url = %config.api_url,
            ws_url = %config.ws_url,
            "Automation session started",
        );

        let (selected_track, _) = watch::channel(None);
        Self {
            api,
            cache,
            mutations,
            notifications,
            selected_track,
            listener_state: listener.state,
            cancel,
            tasks: Mutex::new(tasks),
        }
    }

    pub fn api(&self) -> &RadioApi {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationExecutor {
        &self.mutations
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn listener_state(&self) -> watch::Receiver<ConnectionState> {
        self.listener_state.clone()
    }

    /// Cancel background work and in-flight fetches, then drop every
    /// cached value. Observers created from this session see their
    /// channels close.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down automation session");
        self.cancel.cancel();
        self.cache.clear();

        let tasks = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            let _ = tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, task).await;
        }
        tracing::info!("Automation session shut down");
    }

    // ---- reads ----

    /// Tracks matching `filter`, under `QueryKey::tracks_filtered`.
    pub fn tracks(&self, filter: &TrackFilter) -> QueryObserver<Vec<AudioTrack>> {
        let filter_for_fetch = filter.clone();
        self.observe(QueryKey::tracks_filtered(filter), move |api| {
            let filter = filter_for_fetch.clone();
            async move { api.list_tracks(&filter).await }
        })
    }

    /// Tracks of one folder, through the legacy folder fallback.
    pub fn folder_tracks(
        &self,
        folder_id: DbId,
        search: Option<&str>,
    ) -> QueryObserver<Vec<AudioTrack>> {
        let mut filter = TrackFilter::folder(folder_id);
        if let Some(search) = search {
            filter = filter.with_search(search);
        }
        self.tracks(&filter)
    }

    /// `GET /folders`
    pub fn folders(&self) -> QueryObserver<Vec<MediaFolder>> {
        self.observe(QueryKey::folders(), |api| async move { api.list_folders().await })
    }

    /// `GET /playlists`
    pub fn playlists(&self) -> QueryObserver<Vec<Playlist>> {
        self.observe(QueryKey::playlist_list(), |api| async move {
            api.list_playlists().await
        })
    }

    /// `GET /playlists/:id/items`, sorted by position.
    pub fn playlist_items(&self, playlist_id: DbId) -> QueryObserver<Vec<PlaylistItem>> {
        self.observe(QueryKey::playlist_items(playlist_id), move |api| async move {
            api.list_playlist_items(playlist_id).await
        })
    }

    /// `GET /instant-players`, for one studio or all of them.
    pub fn instant_players(&self, studio: Option<Studio>) -> QueryObserver<Vec<InstantPlayer>> {
        self.observe(QueryKey::instant_players_for(studio), move |api| async move {
            api.list_instant_players(studio).await
        })
    }

    /// `GET /scheduled-events`
    pub fn scheduled_events(&self) -> QueryObserver<Vec<ScheduledEvent>> {
        self.observe(QueryKey::scheduled_events(), |api| async move {
            api.list_scheduled_events().await
        })
    }

    /// `GET /upcoming-events?studio=&limit=`
    pub fn upcoming_events(
        &self,
        studio: Studio,
        limit: u32,
    ) -> QueryObserver<Vec<ScheduledEvent>> {
        self.observe(QueryKey::upcoming_events_for(studio, limit), move |api| async move {
            api.list_upcoming_events(studio, limit).await
        })
    }

    /// Playback for every studio. Kept current by push updates, the
    /// poller, and playback-affecting actions.
    pub fn playback(&self) -> QueryObserver<PlaybackStates> {
        self.observe(QueryKey::playback(), |api| async move { api.get_playback().await })
    }

    // ---- selection ----

    /// Set or clear the track the user is working with.
    pub fn select_track(&self, track: Option<AudioTrack>) {
        self.selected_track.send_replace(track);
    }

    pub fn selected_track(&self) -> Option<AudioTrack> {
        self.selected_track.borrow().clone()
    }

    pub fn watch_selected_track(&self) -> watch::Receiver<Option<AudioTrack>> {
        self.selected_track.subscribe()
    }

    // ---- cross-cutting actions ----

    /// Append `track_id` to the active playlist of `studio`.
    ///
    /// Uses the cached playlists and items when fresh, fetching them
    /// otherwise.
    pub async fn add_track_to_active_playlist(
        &self,
        track_id: DbId,
        studio: Studio,
    ) -> Result<Option<PlaylistItem>, ActionError> {
        const ACTION: &str = "add track to playlist";

        let api = self.api.clone();
        let playlists = self
            .cache
            .ensure(&QueryKey::playlist_list(), || async move {
                api.list_playlists().await
            })
            .await
            .map_err(|source| self.reject_failed(ACTION, source))?;

        let Some(active) = active_for_studio(&playlists, studio) else {
            return Err(self.mutations.reject(ACTION, ActionError::NoActivePlaylist(studio)));
        };
        let playlist_id = active.id;

        let api = self.api.clone();
        let items = self
            .cache
            .ensure(&QueryKey::playlist_items(playlist_id), || async move {
                api.list_playlist_items(playlist_id).await
            })
            .await
            .map_err(|source| self.reject_failed(ACTION, source))?;

        let item = NewPlaylistItem {
            track_id,
            position: Some(next_position(&items)),
        };
        self.mutations.add_playlist_item(playlist_id, &item).await
    }

    /// [`add_track_to_active_playlist`](Self::add_track_to_active_playlist)
    /// for the selected track. Fails with `NoTrackSelected` when nothing is
    /// selected.

    pub async fn add_selected_track_to_active_playlist(
        &self,
        studio: Studio,
    ) -> Result<Option<PlaylistItem>, ActionError> {
        let selected = self.selected_track.borrow().as_ref().map(|track| track.id);
        let Some(track_id) = selected else {
            return Err(self
                .mutations
                .reject("add track to playlist", ActionError::NoTrackSelected));
        };
        self.add_track_to_active_playlist(track_id, studio).await
    }

    // ---- mutations ----
    //
    // Delegates to `MutationExecutor`, which notifies the user and
    // invalidates the affected keys.

    /// `POST /tracks/upload`. Invalidates tracks and folders.
    pub async fn upload_track(
        &self,
        upload: NewTrackUpload,
    ) -> Result<Option<AudioTrack>, ActionError> {
        self.mutations.upload_track(upload).await
    }

    /// `PATCH /tracks/:id`. Invalidates tracks and playlists.
    pub async fn update_track(
        &self,
        id: DbId,
        update: &TrackUpdate,
    ) -> Result<Option<AudioTrack>, ActionError> {
        self.mutations.update_track(id, update).await
    }

    /// `DELETE /tracks/:id`. Invalidates tracks, playlists and instant players.
    pub async fn delete_track(&self, id: DbId) -> Result<(), ActionError> {
        self.mutations.delete_track(id).await
    }

    /// `POST /playlists`. Invalidates playlists.
    pub async fn create_playlist(
        &self,
        playlist: &NewPlaylist,
    ) -> Result<Option<Playlist>, ActionError> {
        self.mutations.create_playlist(playlist).await
    }

    /// `PATCH /playlists/:id`. Invalidates playlists.
    pub async fn update_playlist(
        &self,
        id: DbId,
        update: &PlaylistUpdate,
    ) -> Result<Option<Playlist>, ActionError> {
        self.mutations.update_playlist(id, update).await
    }

    /// `DELETE /playlists/:id`. Invalidates playlists.
    pub async fn delete_playlist(&self, id: DbId) -> Result<(), ActionError> {
        self.mutations.delete_playlist(id).await
    }

    /// `POST /playlists/:id/items`. Invalidates playlists and their items.
    pub async fn add_playlist_item(
        &self,
        playlist_id: DbId,
        item: &NewPlaylistItem,
    ) -> Result<Option<PlaylistItem>, ActionError> {
        self.mutations.add_playlist_item(playlist_id, item).await
    }

    /// `DELETE /playlists/:id/items/:itemId`. Invalidates playlists.
    pub async fn remove_playlist_item(
        &self,
        playlist_id: DbId,
        item_id: DbId,
    ) -> Result<(), ActionError> {
        self.mutations.remove_playlist_item(playlist_id, item_id).await
    }

    /// `POST /playlists/:id/activate`. Invalidates playlists and playback.
    pub async fn activate_playlist(&self, id: DbId, studio: Studio) -> Result<(), ActionError> {
        self.mutations.activate_playlist(id, studio).await
    }

    /// `POST /folders`. Invalidates folders.
    pub async fn create_folder(
        &self,
        folder: &NewFolder,
    ) -> Result<Option<MediaFolder>, ActionError> {
        self.mutations.create_folder(folder).await
    }

    /// `PATCH /folders/:id`. Invalidates folders.
    pub async fn update_folder(
        &self,
        id: DbId,
        update: &FolderUpdate,
    ) -> Result<Option<MediaFolder>, ActionError> {
        self.mutations.update_folder(id, update).await
    }

    /// `DELETE /folders/:id`. Invalidates folders and tracks.
    pub async fn delete_folder(&self, id: DbId) -> Result<(), ActionError> {
        self.mutations.delete_folder(id).await
    }

    /// `POST /instant-players`. Invalidates instant players.
    pub async fn assign_instant_player(
        &self,
        assignment: &InstantPlayerAssignment,
    ) -> Result<Option<InstantPlayer>, ActionError> {
        self.mutations.assign_instant_player(assignment).await
    }

    /// `DELETE /instant-players/:key/:studio`. Invalidates instant players.
    pub async fn clear_instant_player(
        &self,
        key_number: i32,
        studio: Studio,
    ) -> Result<(), ActionError> {
        self.mutations.clear_instant_player(key_number, studio).await
    }

    /// `POST /instant-players/:key/:studio/play`. Invalidates playback.
    pub async fn play_instant_player(
        &self,
        key_number: i32,
        studio: Studio,
    ) -> Result<(), ActionError> {
        self.mutations.play_instant_player(key_number, studio).await
    }

    /// `POST /scheduled-events`. Invalidates scheduled and upcoming events.
    pub async fn create_scheduled_event(
        &self,
        event: &NewScheduledEvent,
    ) -> Result<Option<ScheduledEvent>, ActionError> {
        self.mutations.create_scheduled_event(event).await
    }

    /// `PATCH /scheduled-events/:id`. Invalidates scheduled and upcoming
    /// events.
    pub async fn update_scheduled_event(
        &self,
        id: DbId,
        update: &ScheduledEventUpdate,
    ) -> Result<Option<ScheduledEvent>, ActionError> {
        self.mutations.update_scheduled_event(id, update).await
    }

    /// `DELETE /scheduled-events/:id`. Invalidates scheduled and upcoming
    /// events.
    pub async fn delete_scheduled_event(&self, id: DbId) -> Result<(), ActionError> {
        self.mutations.delete_scheduled_event(id).await
    }

    /// `POST /playback/:action`. Invalidates playback.
    pub async fn control_playback(
        &self,
        action: PlaybackAction,
        studio: Studio,
    ) -> Result<(), ActionError> {
        self.mutations.control_playback(action, studio).await
    }

    // ---- private helpers ----

    fn reject_failed(&self, action: &'static str, source: ApiError) -> ActionError {
        self.mutations.reject(action, ActionError::Failed { action, source })
    }

    fn observe<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryObserver<T>
    where
        T: Any + Send + Sync,
        F: Fn(RadioApi) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let api = self.api.clone();
        self.cache.observe(key, query_fn(move || fetch(api.clone())))
    }
}

impl Drop for AutomationContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
