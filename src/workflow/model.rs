//! Workflow Data Model
//!
//! Core data structures for Galaxy workflows in their exported (`.ga`) form
//! and for the summary the server returns once a workflow is stored.
//!
//! # Example `.ga` Format (abridged)
//!
//! ```json
//! {
//!   "a_galaxy_workflow": "true",
//!   "name": "paste_columns",
//!   "steps": {
//!     "0": {"id": 0, "type": "data_input", "name": "Input dataset",
//!           "input_connections": {}},
//!     "1": {"id": 1, "type": "data_input", "name": "Input dataset",
//!           "input_connections": {}},
//!     "2": {"id": 2, "type": "tool", "name": "Paste", "tool_id": "Paste1",
//!           "input_connections": {"input1": {"id": 0, "output_name": "output"},
//!                                 "input2": {"id": 1, "output_name": "output"}}}
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::dag::{compare_step_ids, sort_step_ids, DagNode, WorkflowDag};
use crate::error::{Error, Result};
use crate::wrappers::base::{Wrapped, Wrapper};

/// What a workflow step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// A dataset supplied when the workflow is run
    DataInput,
    /// A tool invocation
    Tool,
    /// Any other step type (pauses, subworkflows, ...)
    Other(String),
}

impl StepKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "data_input" => Self::DataInput,
            "tool" => Self::Tool,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Renders a JSON id (string or integer) as a string.
pub(crate) fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A single step of an exported workflow.
///
/// Steps are owned by their [`Workflow`] and reached through it
/// ([`Workflow::steps`], [`Workflow::step`]); they carry no wrapper-level
/// parent link. Edits to a step show up in [`Workflow::is_modified`].
#[derive(Debug, Clone)]
pub struct Step {
    /// Key of this step in the workflow's `steps` object
    key: String,
    inner: Wrapper,
}

impl Step {
    pub const BASE_ATTRS: &'static [&'static str] = &[
        "id",
        "name",
        "type",
        "label",
        "uuid",
        "annotation",
        "tool_id",
        "tool_version",
        "tool_state",
        "tool_errors",
        "input_connections",
        "inputs",
        "outputs",
        "position",
        "post_job_actions",
        "user_outputs",
    ];

    /// Wraps the step stored under `key` in a workflow's `steps` object.
    pub fn new(key: impl Into<String>, record: Value) -> Result<Self> {
        Ok(Self {
            key: key.into(),
            inner: Wrapper::new("Step", Self::BASE_ATTRS, record)?,
        })
    }

    /// Identifier of the step within its workflow (its `id`, or its key
    /// when the record has none).
    pub fn step_id(&self) -> String {
        self.inner
            .field("id")
            .and_then(json_id)
            .unwrap_or_else(|| self.key.clone())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> StepKind {
        StepKind::parse(self.inner.field_str("type").unwrap_or("tool"))
    }

    pub fn is_data_input(&self) -> bool {
        self.kind() == StepKind::DataInput
    }

    pub fn is_tool(&self) -> bool {
        self.kind() == StepKind::Tool
    }

    pub fn tool_id(&self) -> Option<&str> {
        self.inner.field_str("tool_id")
    }

    pub fn tool_version(&self) -> Option<&str> {
        self.inner.field_str("tool_version")
    }

    pub fn annotation(&self) -> Option<&str> {
        self.inner.field_str("annotation")
    }

    /// Maps each connected input name to the id of the step feeding it.
    ///
    /// Accepts both the single-connection form
    /// (`{"input1": {"id": 0, ...}}`) and the multi-connection list form.
    /// For multiple connections on one input, the first one wins here; see
    /// [`DagNode::upstream_ids`] for all of them.
    pub fn input_steps(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (name, source) in self.connections() {
            out.entry(name.to_string()).or_insert(source);
        }
        out
    }

    fn connections(&self) -> Vec<(&str, String)> {
        let Some(Value::Object(conns)) = self.inner.field("input_connections") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (name, conn) in conns {
            let links: Vec<&Value> = match conn {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for link in links {
                if let Some(id) = link.get("id").and_then(json_id) {
                    out.push((name.as_str(), id));
                }
            }
        }
        out
    }

    pub fn wrapper_mut(&mut self) -> &mut Wrapper {
        &mut self.inner
    }
}

impl Wrapped for Step {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}

impl DagNode for Step {
    fn node_id(&self) -> String {
        self.step_id()
    }

    fn upstream_ids(&self) -> Vec<String> {
        self.connections().into_iter().map(|(_, id)| id).collect()
    }
}

/// A Galaxy workflow in exported form, optionally mapped to a stored
/// workflow on the server.
///
/// Steps are ordered by their integer key. Modifying any step marks the
/// whole workflow as modified.
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Top-level record, without `steps`
    inner: Wrapper,
    steps: Vec<Step>,
    info: Option<WorkflowInfo>,
}

impl Workflow {
    pub const BASE_ATTRS: &'static [&'static str] = &[
        "id",
        "name",
        "annotation",
        "a_galaxy_workflow",
        "format-version",
        "uuid",
        "tags",
        "version",
        "deleted",
        "published",
    ];

    /// Builds a workflow from its exported dictionary.
    pub fn new(record: Value) -> Result<Self> {
        let mut map = Wrapper::new("Workflow", Self::BASE_ATTRS, record)?.into_wrapped();

        let steps = match map.remove("steps") {
            Some(Value::Object(steps)) => Self::wrap_steps(steps)?,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                return Err(Error::InvalidWorkflow(
                    "'steps' must be an object keyed by step id".to_string(),
                ))
            }
        };

        Ok(Self {
            inner: Wrapper::from_map("Workflow", Self::BASE_ATTRS, map),
            steps,
            info: None,
        })
    }

    fn wrap_steps(steps: Map<String, Value>) -> Result<Vec<Step>> {
        let mut keyed: Vec<(String, Value)> = steps.into_iter().collect();
        keyed.sort_by(|a, b| compare_step_ids(&a.0, &b.0));
        keyed
            .into_iter()
            .map(|(key, record)| Step::new(key, record))
            .collect()
    }

    /// Parses the JSON text of a `.ga` file.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::new(serde_json::from_str(text)?)
    }

    /// Maps the workflow to the stored workflow `id`.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.inner.set_id(id);
        self
    }

    /// Attaches the server-side summary of the workflow.
    pub fn with_info(mut self, info: WorkflowInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Steps in key order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    /// Finds a step by its id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id() == id)
    }

    pub fn data_inputs(&self) -> Vec<&Step> {
        self.steps.iter().filter(|s| s.is_data_input()).collect()
    }

    pub fn tools(&self) -> Vec<&Step> {
        self.steps.iter().filter(|s| s.is_tool()).collect()
    }

    pub fn annotation(&self) -> Option<&str> {
        self.inner.field_str("annotation")
    }

    pub fn info(&self) -> Option<&WorkflowInfo> {
        self.info.as_ref()
    }

    /// Ids of the inputs to supply when running the workflow, in the order
    /// inputs are matched positionally.
    ///
    /// Taken from the server-side summary when attached, otherwise from the
    /// data input steps of the exported form.
    pub fn inputs(&self) -> Vec<String> {
        match &self.info {
            Some(info) => info.inputs(),
            None => {
                let mut ids: Vec<String> =
                    self.data_inputs().iter().map(|s| s.step_id()).collect();
                sort_step_ids(&mut ids);
                ids
            }
        }
    }

    /// Dependency graph of the exported steps.
    pub fn dag(&self) -> WorkflowDag {
        WorkflowDag::build(&self.steps)
    }

    /// Reassembles the exported dictionary, steps included.
    pub fn export(&self) -> Map<String, Value> {
        let mut map = self.inner.wrapped().clone();
        map.remove("id");
        let steps: Map<String, Value> = self
            .steps
            .iter()
            .map(|s| (s.key.clone(), Value::Object(s.wrapped().clone())))
            .collect();
        map.insert("steps".to_string(), Value::Object(steps));
        map
    }

    pub fn wrapper_mut(&mut self) -> &mut Wrapper {
        &mut self.inner
    }

    pub(crate) fn unmap(&mut self) {
        self.inner.unmap();
    }
}

impl Wrapped for Workflow {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }

    fn is_modified(&self) -> bool {
        self.inner.is_modified() || self.steps.iter().any(|s| s.is_modified())
    }

    /// The full exported dictionary, as accepted by [`Workflow::from_json`].
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export())?)
    }
}

/// One step as described by `GET /api/workflows/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoStep {
    pub id: String,
    pub step_type: Option<String>,
    pub tool_id: Option<String>,
    /// Input name → id of the step feeding it
    pub input_steps: BTreeMap<String, String>,
}

impl InfoStep {
    fn parse(key: &str, record: &Value) -> Self {
        let id = record
            .get("id")
            .and_then(json_id)
            .unwrap_or_else(|| key.to_string());

        let input_steps = record
            .get("input_steps")
            .and_then(Value::as_object)
            .map(|links| {
                links
                    .iter()
                    .filter_map(|(name, link)| {
                        link.get("source_step")
                            .and_then(json_id)
                            .map(|src| (name.clone(), src))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id,
            step_type: record.get("type").and_then(Value::as_str).map(str::to_string),
            tool_id: record.get("tool_id").and_then(Value::as_str).map(str::to_string),
            input_steps,
        }
    }
}

impl DagNode for InfoStep {
    fn node_id(&self) -> String {
        self.id.clone()
    }

    fn upstream_ids(&self) -> Vec<String> {
        self.input_steps.values().cloned().collect()
    }
}

/// Server-side summary of a stored workflow: its id, run-time inputs and
/// the step graph.
#[derive(Debug, Clone)]
pub struct WorkflowInfo {
    inner: Wrapper,
    steps: Vec<InfoStep>,
    dag: WorkflowDag,
}

impl WorkflowInfo {
    pub const BASE_ATTRS: &'static [&'static str] = &[
        "id",
        "name",
        "url",
        "owner",
        "inputs",
        "steps",
        "tags",
        "deleted",
        "published",
        "annotation",
    ];

    pub fn new(record: Value) -> Result<Self> {
        let inner = Wrapper::new("WorkflowInfo", Self::BASE_ATTRS, record)?;

        let mut steps: Vec<InfoStep> = inner
            .field("steps")
            .and_then(Value::as_object)
            .map(|steps| {
                steps
                    .iter()
                    .map(|(key, record)| InfoStep::parse(key, record))
                    .collect()
            })
            .unwrap_or_default();
        steps.sort_by(|a, b| compare_step_ids(&a.id, &b.id));

        let dag = WorkflowDag::build(&steps);
        Ok(Self { inner, steps, dag })
    }

    /// Input ids, ascending by integer value.
    pub fn inputs(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .field("inputs")
            .and_then(Value::as_object)
            .map(|inputs| inputs.keys().cloned().collect())
            .unwrap_or_default();
        sort_step_ids(&mut ids);
        ids
    }

    /// Label of input `id`, if the server gave one.
    pub fn input_label(&self, id: &str) -> Option<&str> {
        self.inner
            .field("inputs")
            .and_then(|inputs| inputs.get(id))
            .and_then(|input| input.get("label"))
            .and_then(Value::as_str)
    }

    pub fn steps(&self) -> &[InfoStep] {
        &self.steps
    }

    pub fn dag(&self) -> &WorkflowDag {
        &self.dag
    }

    /// Step ids in dependency order.
    pub fn sorted_step_ids(&self) -> Result<Vec<String>> {
        self.dag.sorted_step_ids()
    }
}

impl Wrapped for WorkflowInfo {
    fn wrapper(&self) -> &Wrapper {
        &self.inner
    }
}
