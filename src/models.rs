//! Core data models used throughout the gallery.
//!
//! Items, folders and tags are owned by the library service; these types only
//! mirror its JSON shape for display. [`ItemListOptions`] and [`GalleryData`]
//! are request-scoped values built fresh for every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single media entry as reported by the library service.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(default)]
    pub annotation: String,
    #[serde(default)]
    pub url: String,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(default)]
    pub btime: i64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub modification_time: i64,
}

impl Item {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.btime)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.modification_time)
    }
}

/// A folder in the library; folders nest through `children`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub children: Vec<Folder>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Sort key understood by the library service's item list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderBy {
    #[default]
    CreateDate,
    FileSize,
    Name,
    Resolution,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::CreateDate => "CREATEDATE",
            OrderBy::FileSize => "FILESIZE",
            OrderBy::Name => "NAME",
            OrderBy::Resolution => "RESOLUTION",
        }
    }

    /// Value for the `orderBy` query parameter; descending order is a `-` prefix.
    pub fn to_param(self, descending: bool) -> String {
        if descending {
            format!("-{}", self.as_str())
        } else {
            self.as_str().to_string()
        }
    }
}

/// Filter and pagination request sent to the library service.
///
/// `offset` is a page index in the library service's terms, not an item
/// count: the service skips `offset * limit` items.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemListOptions {
    pub limit: usize,
    pub offset: usize,
    pub order_by: OrderBy,
    pub descending: bool,
    pub keyword: String,
    pub ext: String,
    /// Comma-joined tag names.
    pub tags: String,
    /// Comma-joined folder ids.
    pub folders: String,
}

/// Request body for the library service's add-from-path endpoint.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFromPathOptions {
    pub path: String,
    pub name: String,
    pub website: String,
    pub annotation: String,
    pub tags: Vec<String>,
    pub folder_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub build_version: String,
    #[serde(default)]
    pub platform: String,
}

/// Render model handed to the templates.
///
/// `all_tags` and `all_folders` are only populated for page 0; incremental
/// fetches leave them empty so the navigation is not re-sent on every scroll.
#[derive(Debug, Clone, Serialize)]
pub struct GalleryData {
    pub items: Vec<Item>,
    pub page: usize,
    pub all_tags: Vec<String>,
    pub all_folders: Vec<Folder>,
    pub filter: ItemListOptions,
}
