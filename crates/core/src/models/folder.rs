use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// A library folder. Folders form a tree through `parent_id`; roots have
/// no parent. The backend guarantees the tree is acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFolder {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub parent_id: Option<DbId>,
}

impl MediaFolder {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Children of `parent` (roots when `None`), in backend order.
pub fn children_of(folders: &[MediaFolder], parent: Option<DbId>) -> Vec<&MediaFolder> {
    folders.iter().filter(|f| f.parent_id == parent).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<DbId>,
}
