//! Object Wrappers
//!
//! Typed views over the JSON records exchanged with a Galaxy server, built on
//! the change-tracking [`Wrapper`].
//!
//! # Structure
//!
//! - [`base`]: The change-tracking wrapper and the [`Wrapped`] trait
//! - [`library`]: Data libraries and their folders
//! - [`history`]: Histories
//! - [`dataset`]: Library datasets and history dataset associations
//! - [`preview`]: Listing summaries
//!
//! Workflows and their steps live in [`crate::workflow`].

pub mod base;
pub mod dataset;
pub mod history;
pub mod library;
pub mod preview;

pub use base::{Wrapped, Wrapper, PARENT_ATTR};
pub use dataset::{Dataset, DatasetKind, DatasetState};
pub use history::History;
pub use library::{Folder, Library};
pub use preview::Preview;
