//! Error Types
//!
//! A single error enum shared by the wrappers, the workflow analyzer and the
//! HTTP client, with a crate-wide [`Result`] alias.

use thiserror::Error;

/// Errors produced by galaxy-objects.
#[derive(Debug, Error)]
pub enum Error {
    /// Read or write of a field outside the wrapper's declared attributes
    #[error("'{kind}' object has no attribute '{attr}'")]
    AttributeAccess { kind: String, attr: String },

    /// Write to an attribute that can only be read
    #[error("attribute '{0}' is read-only")]
    ReadOnlyAttribute(String),

    /// Wrapper constructed from something other than a JSON object
    #[error("wrapped data must be a JSON object, got {0}")]
    NotAMapping(&'static str),

    /// The workflow step graph contains a loop
    #[error("workflow steps contain a dependency cycle involving {0:?}")]
    CycleDetected(Vec<String>),

    /// A workflow definition that cannot be used as-is
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level failure (DNS, refused connection, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("request to {url} returned status {status}: {body}")]
    Connection { status: u16, url: String, body: String },

    /// The server answered, but not with what the client expected
    #[error("unexpected response from server: {0}")]
    InvalidResponse(String),

    /// Server-side operation attempted on an object with no id
    #[error("{0} is not mapped to a Galaxy object")]
    NotMapped(String),

    #[error("workflow needs {expected} inputs, got {got}")]
    NotEnoughInputs { expected: usize, got: usize },

    #[error("dataset {id} entered state '{state}'")]
    DatasetFailed { id: String, state: String },

    #[error("timed out waiting for dataset {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an [`Error::InvalidResponse`] from anything displayable.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}
