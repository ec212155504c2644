//! Workflow Definition Module
//!
//! Provides data structures for exported and stored Galaxy workflows, the
//! loader for `.ga` files, and the step dependency analysis.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Workflow, Step, WorkflowInfo)
//! - [`parser`]: `.ga` loading, checking and saving
//! - [`dag`]: Step dependency graph and topological ordering

pub mod dag;
pub mod model;
pub mod parser;

pub use dag::{DagNode, WorkflowDag};
pub use model::{InfoStep, Step, StepKind, Workflow, WorkflowInfo};
pub use parser::{load_workflow, parse_workflow, save_workflow};
