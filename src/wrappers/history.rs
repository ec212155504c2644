//! Histories

use chrono::NaiveDateTime;
use serde_json::Value;

use super::base::{Wrapped, Wrapper};
use crate::error::Result;

/// Timestamp layout used by the Galaxy API (`2014-02-27T15:19:41.806153`).
const GALAXY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A Galaxy history: the workspace datasets are imported into and workflow
/// outputs are written to.
#[derive(Debug, Clone)]
pub struct History {
    inner: Wrapper,
    dataset_ids: Vec<String>,
}

impl History {
    pub const BASE_ATTRS: &'static [&'static str] = &[
        "id",
        "name",
        "annotation",
        "state",
        "state_ids",
        "tags",
        "deleted",
        "purged",
        "published",
        "update_time",
    ];

    /// Wraps a history record as returned by `GET /api/histories/{id}`.
    pub fn new(record: Value) -> Result<Self> {
        Ok(Self {
            inner: Wrapper::new("History", Self::BASE_ATTRS, record)?,
            dataset_ids: Vec::new(),
        })
    }

    /// Fills the dataset ids from a `GET /api/histories/{id}/contents`
    /// listing, skipping deleted entries.
    pub fn with_contents(mut self, contents: &[Value]) -> Self {
        self.dataset_ids = contents
            .iter()
            .filter(|item| !item.get("deleted").and_then(Value::as_bool).unwrap_or(false))
            .filter_map(|item| item.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        self
    }

    pub fn annotation(&self) -> Option<&str> {
        self.inner.field_str("annotation")
    }

    /// Aggregate state of the history's datasets (`ok`, `queued`, ...).
    pub fn state(&self) -> Option<&str> {
        self.inner.field_str("state")
    }

    pub fn deleted(&self) -> bool {
        self.inner.field_bool("deleted")
    }

    pub fn purged(&self) -> bool {
        self.inner.field_bool("purged")
    }

    /// Last modification time reported by the server.
    pub fn update_time(&self) -> Option<NaiveDateTime> {
        self.inner
            .field_str("update_time")
            .and_then(|s| NaiveDateTime::parse_from_str(s, GALAXY_TIME_FORMAT).ok())
    }

    /// Ids of the (non-deleted) datasets, in history order.
    pub fn dataset_ids(&self) -> &[String] {
        &self.dataset_ids
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

    /// Replaces the record with the server's copy; the dataset list stays.
    pub(crate) fn refresh_from(&mut self, record: Value) -> Result<()> {
        self.inner = Wrapper::new("History", Self::BASE_ATTRS, record)?;
        Ok(())
    }
}

impl Wrapped for History {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}
