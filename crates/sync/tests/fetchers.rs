//! Read-path behaviour of the REST wrappers against a scripted backend.

mod common;

use assert_matches::assert_matches;
use serde_json::json;

use common::{api, playback, playlist_item, track, FakeBackend};
use onair_client::ApiError;
use onair_core::models::{PlaybackStatus, TrackFilter};
use onair_core::types::Studio;

// ---------------------------------------------------------------------------
// Test: a 401 degrades every fetcher to its empty value
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_reads_return_empty_values() {
    let backend = FakeBackend::new();
    for url in [
        "/api/radio/tracks",
        "/api/radio/tracks?folderId=7",
        "/api/radio/folders",
        "/api/radio/playlists",
        "/api/radio/playlists/3",
        "/api/radio/playlists/3/items",
        "/api/radio/instant-players?studio=A",
        "/api/radio/scheduled-events",
        "/api/radio/upcoming-events?studio=B&limit=5",
        "/api/radio/playback",
    ] {
        backend.on("GET", url, 401, json!({"error": "Unauthorized"}));
    }
    let api = api(&backend);

    assert!(api.list_tracks(&TrackFilter::all()).await.unwrap().is_empty());
    assert!(api.list_tracks(&TrackFilter::folder(7)).await.unwrap().is_empty());
    assert!(api.list_folders().await.unwrap().is_empty());
    assert!(api.list_playlists().await.unwrap().is_empty());
    assert!(api.get_playlist(3).await.unwrap().is_none());
    assert!(api.list_playlist_items(3).await.unwrap().is_empty());
    assert!(api.list_instant_players(Some(Studio::A)).await.unwrap().is_empty());
    assert!(api.list_scheduled_events().await.unwrap().is_empty());
    assert!(api.list_upcoming_events(Studio::B, 5).await.unwrap().is_empty());
    assert!(api.get_playback().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Test: transport failures and malformed bodies also degrade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_failure_returns_empty_value() {
    let backend = FakeBackend::new();
    backend.on_transport_error("GET", "/api/radio/folders");

    let folders = api(&backend).list_folders().await.unwrap();
    assert!(folders.is_empty());
}

#[tokio::test]
async fn malformed_body_returns_empty_value() {
    let backend = FakeBackend::new();
    backend.on_raw("GET", "/api/radio/playlists", 200, "<html>gateway</html>");

    let playlists = api(&backend).list_playlists().await.unwrap();
    assert!(playlists.is_empty());
}

#[tokio::test]
async fn null_body_returns_empty_value() {
    let backend = FakeBackend::new();
    backend.on("GET", "/api/radio/scheduled-events", 200, json!(null));

    let events = api(&backend).list_scheduled_events().await.unwrap();
    assert!(events.is_empty());
}

// ---------------------------------------------------------------------------
// Test: other non-2xx statuses are errors carrying the backend message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_error_is_reported() {
    let backend = FakeBackend::new();
    backend.on("GET", "/api/radio/tracks", 500, json!({"message": "Database offline"}));

    let err = api(&backend).list_tracks(&TrackFilter::all()).await.unwrap_err();

    assert_matches!(err, ApiError::Status { status: 500, .. });
    assert_eq!(err.resource(), "tracks");
    assert_eq!(err.user_message().as_deref(), Some("Database offline"));
}

#[tokio::test]
async fn unscripted_endpoint_is_a_404_error() {
    let backend = FakeBackend::new();

    let err = api(&backend).list_folders().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

// ---------------------------------------------------------------------------
// Test: successful reads apply derived fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tracks_get_formatted_duration() {
    let backend = FakeBackend::new();
    backend.on("GET", "/api/radio/tracks", 200, json!([track(1, "Intro", None)]));

    let tracks = api(&backend).list_tracks(&TrackFilter::all()).await.unwrap();

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].duration_formatted.as_deref(), Some("3:05"));
}

#[tokio::test]
async fn search_is_passed_as_query_parameter() {
    let backend = FakeBackend::new();
    backend.on("GET", "/api/radio/tracks?search=jingle", 200, json!([track(5, "Jingle", None)]));

    let tracks = api(&backend)
        .list_tracks(&TrackFilter::all().with_search("jingle"))
        .await
        .unwrap();

    assert_eq!(tracks[0].id, 5);
    assert_eq!(backend.count("GET", "/api/radio/tracks?search=jingle"), 1);
}

#[tokio::test]
async fn playlist_items_come_back_in_position_order() {
    let backend = FakeBackend::new();
    let mut late = playlist_item(11, 3, 101, 2);
    late["track"] = track(101, "Late", None);
    backend.on(
        "GET",
        "/api/radio/playlists/3/items",
        200,
        json!([late, playlist_item(10, 3, 100, 0), playlist_item(12, 3, 102, 1)]),
    );

    let items = api(&backend).list_playlist_items(3).await.unwrap();

    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![10, 12, 11]);
    let nested = items[2].track.as_ref().unwrap();
    assert_eq!(nested.duration_formatted.as_deref(), Some("3:05"));
}

#[tokio::test]
async fn playback_is_normalized() {
    let backend = FakeBackend::new();
    backend.on("GET", "/api/radio/playback", 200, playback("playing", "stopped"));

    let states = api(&backend).get_playback().await.unwrap();

    assert_eq!(states[&Studio::A].studio, Some(Studio::A));
    assert_eq!(states[&Studio::A].status, PlaybackStatus::Playing);
    assert_eq!(states[&Studio::B].status, PlaybackStatus::Stopped);
}

#[tokio::test]
async fn null_position_on_one_studio_keeps_both() {
    let backend = FakeBackend::new();
    backend.on(
        "GET",
        "/api/radio/playback",
        200,
        json!({
            "A": {"status": "playing", "currentPosition": 10.0},
            "B": {"status": "stopped", "currentPosition": null}
        }),
    );

    let states = api(&backend).get_playback().await.unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[&Studio::A].current_position, 10.0);
    assert_eq!(states[&Studio::B].current_position, 0.0);
}
