//! Stored workflow operations: import, export, listing and invocation.

use std::time::Duration;

use log::{debug, info};
use serde_json::{json, Map, Value};

use super::instance::{record_id, record_list, GalaxyInstance};
use crate::error::{Error, Result};
use crate::workflow::{Workflow, WorkflowInfo};
use crate::wrappers::{Dataset, History, Preview, Wrapped};

/// Anything a workflow can be imported from.
#[derive(Debug, Clone)]
pub enum WorkflowSource {
    /// An in-memory workflow; its exported form is sent
    Workflow(Workflow),
    /// An exported workflow dictionary
    Dict(Value),
    /// The JSON text of a `.ga` file
    Json(String),
}

impl WorkflowSource {
    fn into_dict(self) -> Result<Value> {
        match self {
            WorkflowSource::Workflow(wf) => Ok(Value::Object(wf.export())),
            WorkflowSource::Dict(value @ Value::Object(_)) => Ok(value),
            WorkflowSource::Dict(_) => Err(Error::NotAMapping("workflow")),
            WorkflowSource::Json(text) => match serde_json::from_str(&text)? {
                value @ Value::Object(_) => Ok(value),
                _ => Err(Error::NotAMapping("workflow")),
            },
        }
    }
}

impl From<Workflow> for WorkflowSource {
    fn from(wf: Workflow) -> Self {
        WorkflowSource::Workflow(wf)
    }
}

impl From<&Workflow> for WorkflowSource {
    fn from(wf: &Workflow) -> Self {
        WorkflowSource::Workflow(wf.clone())
    }
}

impl From<Value> for WorkflowSource {
    fn from(value: Value) -> Self {
        WorkflowSource::Dict(value)
    }
}

impl From<&str> for WorkflowSource {
    fn from(text: &str) -> Self {
        WorkflowSource::Json(text.to_string())
    }
}

impl From<String> for WorkflowSource {
    fn from(text: String) -> Self {
        WorkflowSource::Json(text)
    }
}

/// Where the outputs of a run go.
#[derive(Debug, Clone, Copy)]
pub enum HistoryTarget<'h> {
    Existing(&'h History),
    /// A new history with this name
    New(&'h str),
}

impl<'h> From<&'h History> for HistoryTarget<'h> {
    fn from(history: &'h History) -> Self {
        HistoryTarget::Existing(history)
    }
}

impl<'h> From<&'h str> for HistoryTarget<'h> {
    fn from(name: &'h str) -> Self {
        HistoryTarget::New(name)
    }
}

/// Optional settings of [`WorkflowClient::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Tool parameter overrides, sent as `parameters`.
    ///
    /// Keys are either tool ids (`{"Paste1": {"delimiter": "U"}}`, applied
    /// to every step running that tool) or step ids (`{"2": {...}}`, one
    /// step only). The server resolves both forms.
    pub params: Option<Value>,
    /// Block until every output has left the pending states
    pub wait: bool,
    /// Interval between state checks; the configured default when `None`
    pub polling_interval: Option<Duration>,
    /// Abort waiting as soon as one output fails
    pub break_on_error: bool,
}

/// Workflow operations of one [`GalaxyInstance`].
pub struct WorkflowClient<'a> {
    gi: &'a GalaxyInstance,
}

impl<'a> WorkflowClient<'a> {
    pub(crate) fn new(gi: &'a GalaxyInstance) -> Self {
        Self { gi }
    }

    /// Uploads a workflow and returns the stored copy.
    pub async fn import_new(&self, source: impl Into<WorkflowSource>) -> Result<Workflow> {
        let dict = source.into().into_dict()?;
        let response = self
            .gi
            .post("workflows/upload", &json!({"workflow": dict}))
            .await?;
        let id = record_id(&response)?;
        info!("Imported workflow {}", id);
        self.get(&id).await
    }

    /// Copies a workflow shared by another user into this account.
    pub async fn import_shared(&self, id: &str) -> Result<Workflow> {
        let response = self
            .gi
            .post("workflows/import", &json!({"workflow_id": id}))
            .await?;
        let new_id = record_id(&response)?;
        info!("Imported shared workflow {} as {}", id, new_id);
        self.get(&new_id).await
    }

    /// Fetches the exported form and the server-side summary of a workflow.
    pub async fn get(&self, id: &str) -> Result<Workflow> {
        let dict = self
            .gi
            .get(&format!("workflows/{}/download", id), &[])
            .await?;
        let info = WorkflowInfo::new(self.gi.get(&format!("workflows/{}", id), &[]).await?)?;
        Ok(Workflow::new(dict)?.with_id(id).with_info(info))
    }

    pub async fn get_previews(&self, published: bool) -> Result<Vec<Preview>> {
        let query: &[(&str, &str)] = if published {
            &[("published", "true")]
        } else {
            &[]
        };
        let listing = self.gi.get("workflows", query).await?;
        record_list(listing)?
            .into_iter()
            .map(|record| Preview::new("WorkflowPreview", record))
            .collect()
    }

    /// Full workflows, optionally filtered by exact name.
    pub async fn list(&self, name: Option<&str>, published: bool) -> Result<Vec<Workflow>> {
        let mut workflows = Vec::new();
        for preview in self.get_previews(published).await? {
            if name.is_some() && preview.name() != name {
                continue;
            }
            if let Some(id) = preview.id() {
                workflows.push(self.get(id).await?);
            }
        }
        Ok(workflows)
    }

    /// Deletes the stored workflow and unmaps the local object.
    pub async fn delete(&self, workflow: &mut Workflow) -> Result<()> {
        let id = workflow.require_id()?.to_string();
        self.gi.delete(&format!("workflows/{}", id), None).await?;
        workflow.unmap();
        info!("Deleted workflow {}", id);
        Ok(())
    }

    /// Runs a stored workflow.
    ///
    /// `inputs` are matched positionally to [`Workflow::inputs`]; extra
    /// datasets are ignored. Returns the output datasets and the history
    /// holding them.
    pub async fn run(
        &self,
        workflow: &Workflow,
        inputs: &[&Dataset],
        history: HistoryTarget<'_>,
        options: RunOptions,
    ) -> Result<(Vec<Dataset>, History)> {
        let workflow_id = workflow.require_id()?;
        let input_ids = workflow.inputs();
        if inputs.len() < input_ids.len() {
            return Err(Error::NotEnoughInputs {
                expected: input_ids.len(),
                got: inputs.len(),
            });
        }

        let mut ds_map = Map::new();
        for (input_id, dataset) in input_ids.iter().zip(inputs) {
            ds_map.insert(
                input_id.clone(),
                json!({"id": dataset.require_id()?, "src": dataset.kind().src()}),
            );
        }
        let history_field = match history {
            HistoryTarget::Existing(hist) => format!("hist_id={}", hist.require_id()?),
            HistoryTarget::New(name) => name.to_string(),
        };

        let mut body = Map::new();
        body.insert("workflow_id".into(), json!(workflow_id));
        body.insert("ds_map".into(), Value::Object(ds_map));
        body.insert("history".into(), json!(history_field));
        if let Some(params) = options.params {
            body.insert("parameters".into(), params);
        }

        debug!("Running workflow {} into {}", workflow_id, history_field);
        let response = self.gi.post("workflows", &Value::Object(body)).await?;

        let history_id = response
            .get("history")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::invalid("run response has no history"))?;
        let output_ids: Vec<String> = response
            .get("outputs")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let histories = self.gi.histories();
        let out_history = histories.get(history_id).await?;
        let mut outputs = Vec::with_capacity(output_ids.len());
        for id in &output_ids {
            outputs.push(histories.get_dataset(&out_history, id).await?);
        }
        info!(
            "Workflow {} started: {} output(s) in history {}",
            workflow_id,
            outputs.len(),
            history_id
        );

        if options.wait {
            self.gi
                .datasets()
                .wait_all(&mut outputs, options.polling_interval, options.break_on_error)
                .await?;
        }
        Ok((outputs, out_history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GalaxyConfig;
    use crate::wrappers::DatasetKind;
    use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PASTE: &str = r#"{
        "a_galaxy_workflow": "true",
        "name": "paste",
        "steps": {
            "0": {"id": 0, "type": "data_input", "input_connections": {}},
            "1": {"id": 1, "type": "data_input", "input_connections": {}},
            "2": {"id": 2, "type": "tool", "tool_id": "Paste1",
                  "input_connections": {"input1": {"id": 0}, "input2": {"id": 1}}}
        }
    }"#;

    fn instance(server: &MockServer) -> GalaxyInstance {
        GalaxyInstance::new(GalaxyConfig::new(server.uri(), "secret")).unwrap()
    }

    async fn mount_workflow(server: &MockServer) {
        let dict: Value = serde_json::from_str(PASTE).unwrap();
        Mock::given(method("GET"))
            .and(path("/api/workflows/W1/download"))
            .respond_with(ResponseTemplate::new(200).set_body_json(dict))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/workflows/W1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "W1",
                "name": "paste",
                "inputs": {"10": {"label": "a"}, "9": {"label": "b"}},
                "steps": {
                    "9": {"id": 9, "type": "data_input", "input_steps": {}},
                    "10": {"id": 10, "type": "data_input", "input_steps": {}},
                    "11": {"id": 11, "type": "tool", "tool_id": "Paste1", "input_steps": {
                        "input1": {"source_step": 9, "step_output": "output"},
                        "input2": {"source_step": 10, "step_output": "output"}
                    }}
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_import_new_from_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflows/upload"))
            .and(body_partial_json(json!({"workflow": {"name": "paste"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "W1"})))
            .expect(1)
            .mount(&server)
            .await;
        mount_workflow(&server).await;

        let gi = instance(&server);
        let wf = gi.workflows().import_new(PASTE).await.unwrap();
        assert_eq!(wf.id(), Some("W1"));
        assert_eq!(wf.inputs(), vec!["9".to_string(), "10".to_string()]);
        assert_eq!(wf.info().unwrap().sorted_step_ids().unwrap(), vec!["9", "10", "11"]);
        assert!(!wf.is_modified());
    }

    #[tokio::test]
    async fn test_import_new_rejects_non_mapping() {
        let server = MockServer::start().await;
        let gi = instance(&server);
        assert!(matches!(
            gi.workflows().import_new(json!([1, 2])).await,
            Err(Error::NotAMapping(_))
        ));
    }

    #[tokio::test]
    async fn test_import_shared() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workflows/import"))
            .and(body_json(json!({"workflow_id": "S1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "W1"})))
            .mount(&server)
            .await;
        mount_workflow(&server).await;

        let gi = instance(&server);
        let wf = gi.workflows().import_shared("S1").await.unwrap();
        assert_eq!(wf.id(), Some("W1"));
    }

    #[tokio::test]
    async fn test_previews_published() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workflows"))
            .and(query_param("published", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "W1", "name": "paste", "published": true}
            ])))
            .mount(&server)
            .await;

        let gi = instance(&server);
        let previews = gi.workflows().get_previews(true).await.unwrap();
        assert_eq!(previews.len(), 1);
        assert!(previews[0].published());
    }

    #[tokio::test]
    async fn test_delete_unmaps() {
        let server = MockServer::start().await;
        mount_workflow(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/api/workflows/W1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let gi = instance(&server);
        let mut wf = gi.workflows().get("W1").await.unwrap();
        gi.workflows().delete(&mut wf).await.unwrap();
        assert!(!wf.is_mapped());
    }

    #[tokio::test]
    async fn test_run_not_enough_inputs() {
        let server = MockServer::start().await;
        mount_workflow(&server).await;

        let gi = instance(&server);
        let wf = gi.workflows().get("W1").await.unwrap();
        let ds = Dataset::new(json!({"id": "D1"}), DatasetKind::Library, "L1").unwrap();
        match gi
            .workflows()
            .run(&wf, &[&ds], HistoryTarget::New("out"), RunOptions::default())
            .await
        {
            Err(Error::NotEnoughInputs { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("expected NotEnoughInputs, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_into_new_history() {
        let server = MockServer::start().await;
        mount_workflow(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/workflows"))
            .and(body_json(json!({
                "workflow_id": "W1",
                "ds_map": {
                    "9": {"id": "D1", "src": "ld"},
                    "10": {"id": "D2", "src": "ld"}
                },
                "history": "out"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "history": "H9", "outputs": ["O1"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "H9", "name": "out"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H9/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "O1"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H9/contents/O1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "O1", "state": "ok", "file_ext": "tabular"
            })))
            .mount(&server)
            .await;

        let gi = instance(&server);
        let wf = gi.workflows().get("W1").await.unwrap();
        let d1 = Dataset::new(json!({"id": "D1"}), DatasetKind::Library, "L1").unwrap();
        let d2 = Dataset::new(json!({"id": "D2"}), DatasetKind::Library, "L1").unwrap();

        let options = RunOptions {
            wait: true,
            polling_interval: Some(Duration::from_millis(5)),
            ..RunOptions::default()
        };
        let (outputs, hist) = gi
            .workflows()
            .run(&wf, &[&d1, &d2], "out".into(), options)
            .await
            .unwrap();
        assert_eq!(hist.id(), Some("H9"));
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].container_id(), "H9");
    }

    #[tokio::test]
    async fn test_run_into_existing_history() {
        let server = MockServer::start().await;
        mount_workflow(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/workflows"))
            .and(body_partial_json(json!({"history": "hist_id=H1", "parameters": {"11": {"delimiter": "T"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "history": "H1", "outputs": []
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "H1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H1/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let gi = instance(&server);
        let wf = gi.workflows().get("W1").await.unwrap();
        let hist = History::new(json!({"id": "H1"})).unwrap();
        let d = Dataset::new(json!({"id": "D"}), DatasetKind::History, "H1").unwrap();
        let options = RunOptions {
            params: Some(json!({"11": {"delimiter": "T"}})),
            ..RunOptions::default()
        };
        let (outputs, out_hist) = gi
            .workflows()
            .run(&wf, &[&d, &d], (&hist).into(), options)
            .await
            .unwrap();
        assert!(outputs.is_empty());
        assert_eq!(out_hist.id(), Some("H1"));
    }

    #[tokio::test]
    async fn test_run_params_keyed_by_tool_id() {
        let server = MockServer::start().await;
        mount_workflow(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/workflows"))
            .and(body_partial_json(json!({"parameters": {"Paste1": {"delimiter": "U"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "history": "H1", "outputs": []
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "H1"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/histories/H1/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let gi = instance(&server);
        let wf = gi.workflows().get("W1").await.unwrap();
        let tool_id = wf.tools()[0].tool_id().unwrap().to_string();
        assert_eq!(tool_id, "Paste1");

        let d = Dataset::new(json!({"id": "D"}), DatasetKind::History, "H1").unwrap();
        let options = RunOptions {
            params: Some(json!({ tool_id: {"delimiter": "U"} })),
            ..RunOptions::default()
        };
        gi.workflows()
            .run(&wf, &[&d, &d], "renamed".into(), options)
            .await
            .unwrap();
    }
}
