//! History operations.

use log::{info, warn};
use serde_json::{json, Map, Value};

use super::instance::{first_record, record_id, record_list, GalaxyInstance};
use super::libraries::bool_param;
use crate::error::{Error, Result};
use crate::wrappers::{Dataset, DatasetKind, History, Preview, Wrapped};

/// History attributes the server accepts on update.
const UPDATABLE_ATTRS: &[&str] = &["name", "annotation", "tags", "published"];

/// History operations of one [`GalaxyInstance`].
pub struct HistoryClient<'a> {
    gi: &'a GalaxyInstance,
}

impl<'a> HistoryClient<'a> {
    pub(crate) fn new(gi: &'a GalaxyInstance) -> Self {
        Self { gi }
    }

    pub async fn create(&self, name: &str) -> Result<History> {
        let record = first_record(self.gi.post("histories", &json!({"name": name})).await?)?;
        let id = record_id(&record)?;
        info!("Created history '{}' ({})", name, id);
        self.get(&id).await
    }

    /// Fetches a history together with the ids of its live datasets.
    pub async fn get(&self, id: &str) -> Result<History> {
        let record = self.gi.get(&format!("histories/{}", id), &[]).await?;
        let contents = record_list(
            self.gi
                .get(&format!("histories/{}/contents", id), &[])
                .await?,
        )?;
        Ok(History::new(record)?.with_contents(&contents))
    }

    pub async fn get_previews(&self, deleted: bool) -> Result<Vec<Preview>> {
        let listing = self
            .gi
            .get("histories", &[("deleted", bool_param(deleted))])
            .await?;
        record_list(listing)?
            .into_iter()
            .map(|record| Preview::new("HistoryPreview", record))
            .collect()
    }

    /// Full histories, optionally filtered by exact name.
    pub async fn list(&self, name: Option<&str>, deleted: bool) -> Result<Vec<History>> {
        let mut histories = Vec::new();
        for preview in self.get_previews(deleted).await? {
            if name.is_some() && preview.name() != name {
                continue;
            }
            if let Some(id) = preview.id() {
                histories.push(self.get(id).await?);
            }
        }
        Ok(histories)
    }

    /// Deletes (and optionally purges) the history, then unmaps it.
    pub async fn delete(&self, history: &mut History, purge: bool) -> Result<()> {
        let id = history.require_id()?.to_string();
        let body = purge.then(|| json!({"purge": true}));
        self.gi
            .delete(&format!("histories/{}", id), body.as_ref())
            .await?;
        history.unmap();
        info!("Deleted history {}{}", id, if purge { " (purged)" } else { "" });
        Ok(())
    }

    /// Pushes local edits to the server.
    ///
    /// Does nothing when the history has not been modified. Afterwards the
    /// history holds the server's copy and is clean again.
    pub async fn update(&self, history: &mut History) -> Result<()> {
        if !history.is_modified() {
            return Ok(());
        }
        let id = history.require_id()?.to_string();
        let mut body = Map::new();
        for attr in UPDATABLE_ATTRS {
            if let Some(value) = history.wrapped().get(*attr) {
                body.insert(attr.to_string(), value.clone());
            }
        }
        let record = self
            .gi
            .put(&format!("histories/{}", id), &Value::Object(body))
            .await?;
        history.refresh_from(record)?;
        info!("Updated history {}", id);
        Ok(())
    }

    /// Copies a library dataset into the history.
    pub async fn import_dataset(&self, history: &mut History, dataset: &Dataset) -> Result<Dataset> {
        if dataset.kind() != DatasetKind::Library {
            return Err(Error::invalid(
                "only library datasets can be imported into a history",
            ));
        }
        let hist_id = history.require_id()?.to_string();
        let body = json!({"source": "library", "content": dataset.require_id()?});
        let record = first_record(
            self.gi
                .post(&format!("histories/{}/contents", hist_id), &body)
                .await?,
        )?;
        let id = record_id(&record)?;
        history.push_dataset_id(id.clone());
        self.get_dataset(history, &id).await
    }

    pub async fn get_dataset(&self, history: &History, id: &str) -> Result<Dataset> {
        let hist_id = history.require_id()?;
        let record = self
            .gi
            .get(&format!("histories/{}/contents/{}", hist_id, id), &[])
            .await?;
        Dataset::new(record, DatasetKind::History, hist_id)
    }

    /// All live datasets of the history, in history order.
    pub async fn get_datasets(&self, history: &History) -> Result<Vec<Dataset>> {
        let mut datasets = Vec::with_capacity(history.dataset_ids().len());
        for id in history.dataset_ids() {
            match self.get_dataset(history, id).await {
                Ok(dataset) => datasets.push(dataset),
                Err(Error::Connection { status: 404, .. }) => {
                    warn!("Dataset {} vanished from history", id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(datasets)
    }
}
