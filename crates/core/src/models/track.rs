use serde::{Deserialize, Serialize};

use crate::duration::format_duration;
use crate::error::CoreError;
use crate::models::de::non_negative_seconds;
use crate::types::DbId;

/// An audio file in the station library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    pub id: DbId,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    /// Length in seconds. Never negative.
    #[serde(default, deserialize_with = "non_negative_seconds")]
    pub duration: f64,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub folder_id: Option<DbId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Derived display field. Computed by the fetch layer and never
    /// serialized back to the backend.
    #[serde(default, skip_serializing)]
    pub duration_formatted: Option<String>,
}

impl AudioTrack {
    /// Fill in client-side derived fields.
    pub fn apply_derived_fields(&mut self) {
        self.duration_formatted = Some(format_duration(self.duration));
    }

    pub fn with_derived_fields(mut self) -> Self {
        self.apply_derived_fields();
        self
    }
}

/// Filter parameters for `GET /api/radio/tracks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TrackFilter {
    pub folder_id: Option<DbId>,
    pub search: Option<String>,
}

impl TrackFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn folder(folder_id: DbId) -> Self {
        Self {
            folder_id: Some(folder_id),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }
}

/// A new audio file plus the metadata sent alongside it in the
/// multipart upload form.
#[derive(Debug, Clone, Default)]
pub struct NewTrackUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub folder_id: Option<DbId>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

impl NewTrackUpload {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.file_name.trim().is_empty() {
            return Err(CoreError::Validation("file name is required".into()));
        }
        if self.bytes.is_empty() {
            return Err(CoreError::Validation(format!(
                "file {} is empty",
                self.file_name
            )));
        }
        Ok(())
    }

    /// Text fields of the upload form, in wire naming. Unset fields are
    /// omitted.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(title) = &self.title {
            fields.push(("title", title.clone()));
        }
        if let Some(artist) = &self.artist {
            fields.push(("artist", artist.clone()));
        }
        if let Some(folder_id) = self.folder_id {
            fields.push(("folderId", folder_id.to_string()));
        }
        if let Some(category) = &self.category {
            fields.push(("category", category.clone()));
        }
        if !self.tags.is_empty() {
            fields.push(("tags", self.tags.join(",")));
        }
        fields
    }
}

/// Partial update for `PATCH /api/radio/tracks/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_json() -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "title": "Station ID",
            "duration": 75,
            "path": "/media/ids/station.mp3",
            "fileType": "mp3",
            "folderId": 7
        })
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let track: AudioTrack = serde_json::from_value(track_json()).unwrap();
        assert_eq!(track.id, 42);
        assert_eq!(track.file_type, "mp3");
        assert_eq!(track.folder_id, Some(7));
        assert!(track.artist.is_none());
        assert!(track.duration_formatted.is_none());
    }

    #[test]
    fn negative_or_null_duration_becomes_zero() {
        let mut json = track_json();
        json["duration"] = serde_json::json!(-3.5);
        let track: AudioTrack = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(track.duration, 0.0);

        json["duration"] = serde_json::Value::Null;
        let track: AudioTrack = serde_json::from_value(json).unwrap();
        assert_eq!(track.duration, 0.0);
    }

    #[test]
    fn formatted_duration_is_never_serialized() {
        let track: AudioTrack = serde_json::from_value(track_json()).unwrap();
        let track = track.with_derived_fields();
        assert_eq!(track.duration_formatted.as_deref(), Some("1:15"));

        let out = serde_json::to_value(&track).unwrap();
        assert!(out.get("durationFormatted").is_none());
        assert!(out.get("duration_formatted").is_none());
        assert_eq!(out["duration"], 75.0);
    }

    #[test]
    fn track_update_omits_unset_fields() {
        let update = TrackUpdate {
            title: Some("New title".into()),
            ..Default::default()
        };
        let out = serde_json::to_value(&update).unwrap();
        assert_eq!(out, serde_json::json!({"title": "New title"}));
    }

    #[test]
    fn blank_search_is_dropped() {
        let filter = TrackFilter::folder(3).with_search("   ");
        assert_eq!(filter.search, None);
        assert_eq!(filter.folder_id, Some(3));
    }

    #[test]
    fn upload_requires_file_content() {
        let upload = NewTrackUpload {
            file_name: "jingle.wav".into(),
            ..Default::default()
        };
        assert!(matches!(upload.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn upload_form_fields_use_wire_names() {
        let upload = NewTrackUpload {
            file_name: "jingle.wav".into(),
            bytes: vec![1, 2, 3],
            title: Some("Jingle".into()),
            folder_id: Some(9),
            tags: vec!["id".into(), "morning".into()],
            ..Default::default()
        };
        assert!(upload.validate().is_ok());
        assert_eq!(
            upload.form_fields(),
            vec![
                ("title", "Jingle".to_string()),
                ("folderId", "9".to_string()),
                ("tags", "id,morning".to_string()),
            ]
        );
    }
}
