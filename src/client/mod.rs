//! Galaxy REST Client
//!
//! Async client for the Galaxy API, built on reqwest.
//!
//! # Structure
//!
//! - [`config`]: Connection settings (environment, YAML file)
//! - [`instance`]: [`GalaxyInstance`], the shared connection
//! - [`libraries`]: Data libraries, folders and uploads
//! - [`histories`]: Histories and their datasets
//! - [`workflows`]: Stored workflows and runs
//! - [`datasets`]: State polling and downloads

pub mod config;
pub mod datasets;
pub mod histories;
pub mod instance;
pub mod libraries;
pub mod workflows;

pub use config::GalaxyConfig;
pub use datasets::{DatasetClient, DatasetStream, DEFAULT_CHUNK_SIZE};
pub use histories::HistoryClient;
pub use instance::GalaxyInstance;
pub use libraries::{LibraryClient, LinkMode};
pub use workflows::{HistoryTarget, RunOptions, WorkflowClient, WorkflowSource};
