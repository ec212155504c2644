//! galaxy-objects - Object layer for the Galaxy workflow server
//!
//! Wraps the JSON records of the Galaxy REST API (libraries, histories,
//! datasets, workflows) in typed objects that track local modification, and
//! analyzes the step graph of exported workflows.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`wrappers`]: The change-tracking wrapper and the typed Galaxy objects
//! - [`workflow`]: Workflow model, `.ga` parsing and the step DAG
//! - [`client`]: Async REST client for a Galaxy server
//! - [`error`]: The crate-wide error type
//!
//! # Example
//!
//! ```rust,no_run
//! use galaxy_objects::client::{GalaxyInstance, HistoryTarget, RunOptions};
//! use galaxy_objects::load_workflow;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gi = GalaxyInstance::from_env()?;
//!
//!     // Upload a workflow and some data
//!     let wf = gi.workflows().import_new(load_workflow("paste_columns.ga")?).await?;
//!     let mut lib = gi.libraries().create("demo", None, None).await?;
//!     let a = gi.libraries().upload_data(&mut lib, "1\n2\n", None).await?;
//!     let b = gi.libraries().upload_data(&mut lib, "3\n4\n", None).await?;
//!
//!     // Run it and wait for the outputs
//!     let options = RunOptions { wait: true, ..RunOptions::default() };
//!     let (outputs, _history) = gi
//!         .workflows()
//!         .run(&wf, &[&a, &b], HistoryTarget::New("demo run"), options)
//!         .await?;
//!     println!("{} output(s)", outputs.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod workflow;
pub mod wrappers;

// Re-export commonly used types
pub use client::{GalaxyConfig, GalaxyInstance};
pub use error::{Error, Result};
pub use workflow::model::{Step, Workflow};
pub use workflow::parser::load_workflow;
pub use wrappers::{Wrapped, Wrapper};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "galaxy-objects";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "galaxy-objects");
    }

    #[test]
    fn test_module_exports_step() {
        let step = Step::new("0", json!({"id": 0, "type": "data_input"})).unwrap();
        assert_eq!(step.step_id(), "0");
        assert!(step.is_data_input());
    }

    #[test]
    fn test_module_exports_workflow() {
        let workflow = Workflow::new(json!({"name": "empty", "steps": {}})).unwrap();
        assert!(workflow.steps().is_empty());
        assert_eq!(workflow.name(), Some("empty"));
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
