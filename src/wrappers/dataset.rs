//! Datasets
//!
//! Galaxy exposes the same underlying data through two associations: a
//! library dataset (LD) inside a data library and a history dataset
//! association (HDA) inside a history. Both are represented by [`Dataset`],
//! distinguished by [`DatasetKind`].

use std::fmt;

use serde_json::Value;

use super::base::{Wrapped, Wrapper};
use crate::error::Result;

/// Which container a dataset lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// Library dataset
    Library,
    /// History dataset association
    History,
}

impl DatasetKind {
    /// Source tag used in workflow input maps.
    pub fn src(self) -> &'static str {
        match self {
            Self::Library => "ld",
            Self::History => "hda",
        }
    }

    /// Value of the `hda_ldda` query parameter on display requests.
    pub fn hda_ldda(self) -> &'static str {
        match self {
            Self::Library => "ldda",
            Self::History => "hda",
        }
    }
}

/// Processing state of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetState {
    New,
    Upload,
    Queued,
    Running,
    SettingMetadata,
    Paused,
    Ok,
    Empty,
    Error,
    FailedMetadata,
    Discarded,
    /// Anything this client does not know about
    Other(String),
}

impl DatasetState {
    pub fn parse(s: &str) -> Self {
        match s {
            "new" => Self::New,
            "upload" => Self::Upload,
            "queued" => Self::Queued,
            "running" => Self::Running,
            "setting_metadata" => Self::SettingMetadata,
            "paused" => Self::Paused,
            "ok" => Self::Ok,
            "empty" => Self::Empty,
            "error" => Self::Error,
            "failed_metadata" => Self::FailedMetadata,
            "discarded" => Self::Discarded,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Upload => "upload",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::SettingMetadata => "setting_metadata",
            Self::Paused => "paused",
            Self::Ok => "ok",
            Self::Empty => "empty",
            Self::Error => "error",
            Self::FailedMetadata => "failed_metadata",
            Self::Discarded => "discarded",
            Self::Other(s) => s,
        }
    }

    /// True while Galaxy is still working on the dataset.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::New | Self::Upload | Self::Queued | Self::Running | Self::SettingMetadata
        )
    }

    /// True for the states a job can end in without producing usable data.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::FailedMetadata | Self::Discarded)
    }
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dataset in a library or a history.
#[derive(Debug, Clone)]
pub struct Dataset {
    inner: Wrapper,
    kind: DatasetKind,
    container_id: String,
}

impl Dataset {
    pub const BASE_ATTRS: &'static [&'static str] = &[
        "id",
        "name",
        "data_type",
        "file_ext",
        "file_name",
        "file_size",
        "genome_build",
        "misc_info",
        "misc_blurb",
        "peek",
        "state",
        "deleted",
        "visible",
        "ldda_id",
    ];

    /// Wraps a dataset record belonging to the library or history
    /// `container_id`.
    pub fn new(record: Value, kind: DatasetKind, container_id: impl Into<String>) -> Result<Self> {
        let type_name = match kind {
            DatasetKind::Library => "LibraryDataset",
            DatasetKind::History => "HistoryDatasetAssociation",
        };
        Ok(Self {
            inner: Wrapper::new(type_name, Self::BASE_ATTRS, record)?,
            kind,
            container_id: container_id.into(),
        })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Id of the library or history holding this dataset.
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Path of the file on the Galaxy server.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.field_str("file_name")
    }

    /// Datatype extension (`txt`, `tabular`, `fastqsanger`, ...).
    pub fn file_ext(&self) -> Option<&str> {
        self.inner
            .field_str("file_ext")
            .or_else(|| self.inner.field_str("data_type"))
    }

    pub fn file_size(&self) -> Option<u64> {
        self.inner.field("file_size").and_then(Value::as_u64)
    }

    /// Current state, `None` if the record does not carry one.
    pub fn state(&self) -> Option<DatasetState> {
        self.inner.field_str("state").map(DatasetState::parse)
    }

    /// Id to use on `/api/datasets/{id}/display`.
    ///
    /// Library listings return library-dataset ids; the display endpoint
    /// wants the underlying LDDA id when the record provides it.
    pub fn display_id(&self) -> Option<&str> {
        match self.kind {
            DatasetKind::Library => self.inner.field_str("ldda_id").or_else(|| self.id()),
            DatasetKind::History => self.id(),
        }
    }

    pub fn wrapper_mut(&mut self) -> &mut Wrapper {
        &mut self.inner
    }

    /// Replaces the record with a fresher copy from the server.
    pub(crate) fn refresh_from(&mut self, record: Value) -> Result<()> {
        let refreshed = Wrapper::new(self.inner.kind(), Self::BASE_ATTRS, record)?;
        self.inner = refreshed;
        Ok(())
    }
}

impl Wrapped for Dataset {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_state_parse() {
        assert_eq!(DatasetState::parse("ok"), DatasetState::Ok);
        assert_eq!(
            DatasetState::parse("setting_metadata"),
            DatasetState::SettingMetadata
        );
        assert_eq!(
            DatasetState::parse("deferred"),
            DatasetState::Other("deferred".to_string())
        );
        assert_eq!(DatasetState::parse("queued").to_string(), "queued");
    }

    #[test]
    fn test_state_classification() {
        assert!(DatasetState::Queued.is_pending());
        assert!(DatasetState::Running.is_pending());
        assert!(!DatasetState::Ok.is_pending());
        assert!(!DatasetState::Ok.is_error());
        assert!(DatasetState::Error.is_error());
        assert!(!DatasetState::Paused.is_pending());
    }

    #[test]
    fn test_library_dataset() {
        let ds = Dataset::new(
            json!({"id": "ld1", "ldda_id": "ldda1", "file_name": "/tmp/x", "file_size": 8}),
            DatasetKind::Library,
            "lib1",
        )
        .unwrap();

        assert_eq!(ds.kind().src(), "ld");
        assert_eq!(ds.container_id(), "lib1");
        assert_eq!(ds.file_name(), Some("/tmp/x"));
        assert_eq!(ds.file_size(), Some(8));
        assert_eq!(ds.display_id(), Some("ldda1"));
        assert!(ds.state().is_none());
    }

    #[test]
    fn test_history_dataset() {
        let ds = Dataset::new(
            json!({"id": "hda1", "state": "running", "data_type": "tabular"}),
            DatasetKind::History,
            "h1",
        )
        .unwrap();

        assert_eq!(ds.kind().src(), "hda");
        assert_eq!(ds.kind().hda_ldda(), "hda");
        assert_eq!(ds.display_id(), Some("hda1"));
        assert_eq!(ds.file_ext(), Some("tabular"));
        assert_eq!(ds.state(), Some(DatasetState::Running));
    }

    #[test]
    fn test_refresh_resets_taint() {
        let mut ds = Dataset::new(json!({"id": "hda1", "state": "queued"}), DatasetKind::History, "h1")
            .unwrap();
        ds.wrapper_mut().set("name", "renamed").unwrap();
        ds.refresh_from(json!({"id": "hda1", "state": "ok"})).unwrap();
        assert_eq!(ds.state(), Some(DatasetState::Ok));
        assert!(!ds.is_modified());
    }

    #[test]
    fn test_undeclared_attribute() {
        let mut ds = Dataset::new(json!({"id": "hda1"}), DatasetKind::History, "h1").unwrap();
        match ds.wrapper_mut().set("foo", 1) {
            Err(Error::AttributeAccess { kind, attr }) => {
                assert_eq!(kind, "HistoryDatasetAssociation");
                assert_eq!(attr, "foo");
            }
            other => panic!("expected attribute error, got {:?}", other),
        }
    }
}
