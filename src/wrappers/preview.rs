//! Previews
//!
//! Listing endpoints return short summaries rather than full objects. A
//! [`Preview`] wraps one of those entries; fetch the full object by id from
//! the matching client when more is needed.

use serde_json::Value;

use super::base::{Wrapped, Wrapper};
use crate::error::Result;

/// Summary entry from a listing endpoint.
#[derive(Debug, Clone)]
pub struct Preview {
    inner: Wrapper,
}

impl Preview {
    pub const BASE_ATTRS: &'static [&'static str] =
        &["id", "name", "deleted", "published", "url", "tags", "model_class"];

    /// Wraps a listing entry. `kind` names the previewed object type in
    /// error messages (`LibraryPreview`, ...).
    pub fn new(kind: &'static str, record: Value) -> Result<Self> {
        Ok(Self {
            inner: Wrapper::new(kind, Self::BASE_ATTRS, record)?,
        })
    }

    pub fn deleted(&self) -> bool {
        self.inner.field_bool("deleted")
    }

    pub fn published(&self) -> bool {
        self.inner.field_bool("published")
    }
}

impl Wrapped for Preview {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview() {
        let p = Preview::new(
            "WorkflowPreview",
            json!({"id": "w1", "name": "paste", "published": true, "url": "/api/workflows/w1"}),
        )
        .unwrap();

        assert_eq!(p.id(), Some("w1"));
        assert_eq!(p.name(), Some("paste"));
        assert!(p.published());
        assert!(!p.deleted());
        assert_eq!(p.wrapper().kind(), "WorkflowPreview");
    }

    #[test]
    fn test_preview_rejects_list() {
        assert!(Preview::new("HistoryPreview", json!([])).is_err());
    }
}
