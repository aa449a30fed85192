//! Compatibility shim for folder track lookups.
//!
//! The backend is inconsistent about the name of the folder filter on
//! `GET /tracks`: for a couple of legacy folders `folderId=N` comes back
//! empty while `folder=N` (or no filter at all) returns the tracks. This
//! adapter papers over that for the known folders only. It is not a retry
//! policy and must not be reused for other endpoints; the fix belongs in
//! the backend's filter contract.

use onair_core::models::AudioTrack;
use onair_core::types::DbId;

use crate::api::{ApiError, RadioApi};

/// Folders known to be affected by the inconsistent filter parameter.
pub const DEFAULT_LEGACY_FOLDER_IDS: [DbId; 2] = [1, 2];

/// Primary filter parameter name.
const PRIMARY_PARAM: &str = "folderId";

/// Alternate parameter name some legacy folders answer to.
const ALTERNATE_PARAM: &str = "folder";

/// Fetch the tracks of one folder.
///
/// Always queries `folderId=N` first. Only when `folder_id` is in
/// `legacy_ids` and that result is empty:
///
/// 1. retry once with `folder=N`;
/// 2. if still empty, fetch once without a folder filter and keep the
///    tracks whose `folder_id` is `N`.
///
/// The search parameter, when present, is sent on every attempt.
pub async fn fetch_folder_tracks(
    api: &RadioApi,
    folder_id: DbId,
    search: Option<&str>,
    legacy_ids: &[DbId],
) -> Result<Vec<AudioTrack>, ApiError> {
    let with_search = |mut params: Vec<(&'static str, String)>| {
        if let Some(search) = search {
            params.push(("search", search.to_string()));
        }
        params
    };

    let tracks = api
        .query_tracks(&with_search(vec![(PRIMARY_PARAM, folder_id.to_string())]))
        .await?;
    if !tracks.is_empty() || !legacy_ids.contains(&folder_id) {
        return Ok(tracks);
    }

    tracing::debug!(folder_id, "Empty folder result, retrying with alternate parameter");
    let tracks = api
        .query_tracks(&with_search(vec![(ALTERNATE_PARAM, folder_id.to_string())]))
        .await?;
    if !tracks.is_empty() {
        return Ok(tracks);
    }

    tracing::debug!(folder_id, "Alternate parameter empty, filtering full track list");
    let tracks = api.query_tracks(&with_search(Vec::new())).await?;
    Ok(tracks
        .into_iter()
        .filter(|track| track.folder_id == Some(folder_id))
        .collect())
}
