//! Workflow Parser
//!
//! Loads exported Galaxy workflows (`.ga` files, JSON) from disk and checks
//! that their step graph is usable before anything is sent to a server.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use super::dag::DagNode;
use super::model::Workflow;
use crate::error::{Error, Result};
use crate::wrappers::Wrapped;

/// Loads a workflow from a `.ga` file.
///
/// This function:
/// 1. Reads and parses the JSON file
/// 2. Checks that every input connection points at a step of the workflow
/// 3. Checks that the step graph has no cycle
///
/// # Example
///
/// ```rust,no_run
/// use galaxy_objects::workflow::load_workflow;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let workflow = load_workflow("paste_columns.ga")?;
///     println!("Loaded {} steps", workflow.steps().len());
///     Ok(())
/// }
/// ```
pub fn load_workflow(path: impl AsRef<Path>) -> Result<Workflow> {
    let path = path.as_ref();
    info!("Loading workflow from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read workflow file '{}': {}", path.display(), e),
        ))
    })?;

    debug!("Workflow content loaded ({} bytes)", content.len());
    parse_workflow(&content)
}

/// Parses and checks the JSON text of an exported workflow.
pub fn parse_workflow(text: &str) -> Result<Workflow> {
    let workflow = Workflow::from_json(text)?;

    info!(
        "Parsed workflow '{}': {} steps ({} inputs, {} tools)",
        workflow.name().unwrap_or("<unnamed>"),
        workflow.steps().len(),
        workflow.data_inputs().len(),
        workflow.tools().len()
    );

    validate_connections(&workflow)?;
    workflow.dag().sorted_step_ids()?;

    Ok(workflow)
}

/// Checks that input connections reference existing steps.
pub fn validate_connections(workflow: &Workflow) -> Result<()> {
    let mut step_ids: HashSet<String> = HashSet::new();
    for step in workflow.steps() {
        if !step_ids.insert(step.step_id()) {
            return Err(Error::InvalidWorkflow(format!(
                "duplicate step id '{}'",
                step.step_id()
            )));
        }
    }

    for step in workflow.steps() {
        for source in step.upstream_ids() {
            if !step_ids.contains(&source) {
                return Err(Error::InvalidWorkflow(format!(
                    "step '{}' references unknown step '{}'",
                    step.step_id(),
                    source
                )));
            }
        }

        if step.is_tool() && step.tool_id().is_none() {
            warn!("Step '{}' is a tool step without tool_id", step.step_id());
        }
    }

    debug!("Input connections validated");
    Ok(())
}

/// Saves a workflow to a `.ga` file.
pub fn save_workflow(workflow: &Workflow, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(&workflow.export())?;
    fs::write(path, content)?;
    info!("Workflow saved to: {}", path.display());
    Ok(())
}
