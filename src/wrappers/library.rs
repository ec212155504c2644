//! Data Libraries and Folders

use serde_json::Value;

use super::base::{Wrapped, Wrapper};
use crate::error::Result;

/// A Galaxy data library.
///
/// Besides the wrapped record, a library tracks the ids of the datasets and
/// folders it contains. The library client keeps these lists current as it
/// uploads data.
#[derive(Debug, Clone)]
pub struct Library {
    inner: Wrapper,
    dataset_ids: Vec<String>,
    folder_ids: Vec<String>,
}

impl Library {
    pub const BASE_ATTRS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "synopsis",
        "deleted",
        "root_folder_id",
        "create_time",
    ];

    /// Wraps a library record as returned by `GET /api/libraries/{id}`.
    pub fn new(record: Value) -> Result<Self> {
        Ok(Self {
            inner: Wrapper::new("Library", Self::BASE_ATTRS, record)?,
            dataset_ids: Vec::new(),
            folder_ids: Vec::new(),
        })
    }

    /// Fills the content id lists from a `GET /api/libraries/{id}/contents`
    /// listing.
    pub fn with_contents(mut self, contents: &[Value]) -> Self {
        self.set_contents(contents);
        self
    }

    pub(crate) fn set_contents(&mut self, contents: &[Value]) {
        self.dataset_ids.clear();
        self.folder_ids.clear();
        for item in contents {
            let Some(id) = item.get("id").and_then(Value::as_str) else {
                continue;
            };
            match item.get("type").and_then(Value::as_str) {
                Some("file") => self.dataset_ids.push(id.to_string()),
                Some("folder") => {
                    if item.get("name").and_then(Value::as_str) == Some("/")
                        && self.inner.field("root_folder_id").is_none()
                    {
                        self.inner
                            .set_untracked("root_folder_id", Value::String(id.to_string()));
                    }
                    self.folder_ids.push(id.to_string());
                }
                _ => {}
            }
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.field_str("description")
    }

    pub fn synopsis(&self) -> Option<&str> {
        self.inner.field_str("synopsis")
    }

    pub fn deleted(&self) -> bool {
        self.inner.field_bool("deleted")
    }

    /// Id of the `/` folder, where uploads land by default.
    pub fn root_folder_id(&self) -> Option<&str> {
        self.inner.field_str("root_folder_id")
    }

    /// Ids of the library datasets, in listing order.
    pub fn dataset_ids(&self) -> &[String] {
        &self.dataset_ids
    }

    /// Ids of all folders, root included.
    pub fn folder_ids(&self) -> &[String] {
        &self.folder_ids
    }

    pub fn wrapper_mut(&mut self) -> &mut Wrapper {
        &mut self.inner
    }

    pub(crate) fn push_dataset_id(&mut self, id: impl Into<String>) {
        self.dataset_ids.push(id.into());
    }

    pub(crate) fn unmap(&mut self) {
        self.inner.unmap();
    }
}

impl Wrapped for Library {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}

/// A folder inside a data library.
#[derive(Debug, Clone)]
pub struct Folder {
    inner: Wrapper,
    container_id: String,
}

impl Folder {
    pub const BASE_ATTRS: &'static [&'static str] =
        &["id", "name", "description", "item_count", "deleted"];

    /// Wraps a folder record belonging to library `container_id`.
    pub fn new(record: Value, container_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: Wrapper::new("Folder", Self::BASE_ATTRS, record)?,
            container_id: container_id.into(),
        })
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.field_str("description")
    }

    /// Id of the library holding this folder.
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn wrapper_mut(&mut self) -> &mut Wrapper {
        &mut self.inner
    }
}

impl Wrapped for Folder {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}
