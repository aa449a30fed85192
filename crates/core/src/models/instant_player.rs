use serde::{Deserialize, Serialize};

use crate::types::{DbId, Studio};

/// A cart-wall hot key. Unique per `(key_number, studio)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantPlayer {
    pub id: DbId,
    pub key_number: i32,
    #[serde(default)]
    pub track_id: Option<DbId>,
    pub studio: Studio,
}

/// Body of `POST /api/radio/instant-players`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantPlayerAssignment {
    pub key_number: i32,
    pub track_id: DbId,
    pub studio: Studio,
}
