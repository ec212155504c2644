//! Data library operations: creation, listing, folders and uploads.

use std::path::Path;

use log::{debug, info};
use reqwest::multipart;
use serde_json::{json, Map, Value};

use super::instance::{first_record, record_id, record_list, GalaxyInstance};
use crate::error::{Error, Result};
use crate::wrappers::{Dataset, DatasetKind, Folder, Library, Preview, Wrapped};

/// How files already on the server filesystem enter a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Copy the files into Galaxy's file store
    #[default]
    Copy,
    /// Reference the files in place
    Link,
}

impl LinkMode {
    fn as_str(self) -> &'static str {
        match self {
            LinkMode::Copy => "copy_files",
            LinkMode::Link => "link_to_files",
        }
    }
}

/// Library operations of one [`GalaxyInstance`].
pub struct LibraryClient<'a> {
    gi: &'a GalaxyInstance,
}

impl<'a> LibraryClient<'a> {
    pub(crate) fn new(gi: &'a GalaxyInstance) -> Self {
        Self { gi }
    }

    /// Creates a library and returns it as stored by the server.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        synopsis: Option<&str>,
    ) -> Result<Library> {
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        if let Some(description) = description {
            body.insert("description".into(), json!(description));
        }
        if let Some(synopsis) = synopsis {
            body.insert("synopsis".into(), json!(synopsis));
        }
        let record = first_record(self.gi.post("libraries", &Value::Object(body)).await?)?;
        let id = record_id(&record)?;
        info!("Created library '{}' ({})", name, id);
        self.get(&id).await
    }

    /// Fetches a library together with the ids of its datasets and folders.
    pub async fn get(&self, id: &str) -> Result<Library> {
        let record = self.gi.get(&format!("libraries/{}", id), &[]).await?;
        let contents = self.contents(id).await?;
        Ok(Library::new(record)?.with_contents(&contents))
    }

    /// Reloads the content lists of `library`.
    pub async fn refresh(&self, library: &mut Library) -> Result<()> {
        let id = library.require_id()?.to_string();
        let contents = self.contents(&id).await?;
        library.set_contents(&contents);
        Ok(())
    }

    pub async fn get_previews(&self, deleted: bool) -> Result<Vec<Preview>> {
        let listing = self
            .gi
            .get("libraries", &[("deleted", bool_param(deleted))])
            .await?;
        record_list(listing)?
            .into_iter()
            .map(|record| Preview::new("LibraryPreview", record))
            .collect()
    }

    /// Full libraries, optionally filtered by exact name.
    pub async fn list(&self, name: Option<&str>, deleted: bool) -> Result<Vec<Library>> {
        let mut libraries = Vec::new();
        for preview in self.get_previews(deleted).await? {
            if name.is_some() && preview.name() != name {
                continue;
            }
            if let Some(id) = preview.id() {
                libraries.push(self.get(id).await?);
            }
        }
        Ok(libraries)
    }

    /// Deletes the library on the server and unmaps the local object.
    pub async fn delete(&self, library: &mut Library) -> Result<()> {
        let id = library.require_id()?.to_string();
        self.gi.delete(&format!("libraries/{}", id), None).await?;
        library.unmap();
        info!("Deleted library {}", id);
        Ok(())
    }

    /// Creates a folder under `base` (the root folder when `None`).
    pub async fn create_folder(
        &self,
        library: &mut Library,
        name: &str,
        description: Option<&str>,
        base: Option<&Folder>,
    ) -> Result<Folder> {
        let folder_id = self.target_folder(library, base).await?;
        let lib_id = library.require_id()?.to_string();
        let body = json!({
            "folder_id": folder_id,
            "create_type": "folder",
            "name": name,
            "description": description.unwrap_or(""),
        });
        let created = first_record(
            self.gi
                .post(&format!("libraries/{}/contents", lib_id), &body)
                .await?,
        )?;
        let id = record_id(&created)?;
        self.refresh(library).await?;
        self.get_folder(library, &id).await
    }

    pub async fn get_folder(&self, library: &Library, id: &str) -> Result<Folder> {
        let lib_id = library.require_id()?;
        let record = self
            .gi
            .get(&format!("libraries/{}/contents/{}", lib_id, id), &[])
            .await?;
        Folder::new(record, lib_id)
    }

    /// Uploads `data` as the content of a new dataset.
    pub async fn upload_data(
        &self,
        library: &mut Library,
        data: &str,
        folder: Option<&Folder>,
    ) -> Result<Dataset> {
        let mut body = self.upload_payload(library, folder, "upload_file").await?;
        body.insert("files_0|url_paste".into(), json!(data));
        body.insert("files_0|type".into(), json!("upload_dataset"));
        self.finish_upload(library, Value::Object(body)).await
    }

    /// Asks the server to fetch `url` into a new dataset.
    pub async fn upload_from_url(
        &self,
        library: &mut Library,
        url: &str,
        folder: Option<&Folder>,
    ) -> Result<Dataset> {
        // The paste field doubles as a URL list.
        self.upload_data(library, url, folder).await
    }

    /// Uploads a local file.
    pub async fn upload_from_local(
        &self,
        library: &mut Library,
        path: impl AsRef<Path>,
        folder: Option<&Folder>,
    ) -> Result<Dataset> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("Uploading {} ({} bytes)", path.display(), content.len());

        let fields = self.upload_payload(library, folder, "upload_file").await?;
        let mut form = multipart::Form::new();
        for (key, value) in fields {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            form = form.text(key, text);
        }
        form = form.part(
            "files_0|file_data",
            multipart::Part::bytes(content).file_name(file_name),
        );

        let lib_id = library.require_id()?.to_string();
        let response = self
            .gi
            .post_multipart(&format!("libraries/{}/contents", lib_id), form)
            .await?;
        self.collect_uploads(library, response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid("upload returned no dataset"))
    }

    /// Imports files that already exist on the server's filesystem.
    ///
    /// Requires an admin key and `allow_library_path_paste` on the server.
    pub async fn upload_from_galaxy_fs(
        &self,
        library: &mut Library,
        paths: &[&str],
        folder: Option<&Folder>,
        link_mode: LinkMode,
    ) -> Result<Vec<Dataset>> {
        let mut body = self.upload_payload(library, folder, "upload_paths").await?;
        body.insert("filesystem_paths".into(), json!(paths.join("\n")));
        body.insert("link_data_only".into(), json!(link_mode.as_str()));
        let lib_id = library.require_id()?.to_string();
        let response = self
            .gi
            .post(&format!("libraries/{}/contents", lib_id), &Value::Object(body))
            .await?;
        self.collect_uploads(library, response).await
    }

    pub async fn get_dataset(&self, library: &Library, id: &str) -> Result<Dataset> {
        let lib_id = library.require_id()?;
        let record = self
            .gi
            .get(&format!("libraries/{}/contents/{}", lib_id, id), &[])
            .await?;
        Dataset::new(record, DatasetKind::Library, lib_id)
    }

    async fn contents(&self, id: &str) -> Result<Vec<Value>> {
        record_list(
            self.gi
                .get(&format!("libraries/{}/contents", id), &[])
                .await?,
        )
    }

    async fn target_folder(&self, library: &mut Library, base: Option<&Folder>) -> Result<String> {
        if let Some(folder) = base {
            return Ok(folder.require_id()?.to_string());
        }
        if library.root_folder_id().is_none() {
            self.refresh(library).await?;
        }
        library
            .root_folder_id()
            .map(str::to_string)
            .ok_or_else(|| Error::invalid("library has no root folder"))
    }

    async fn upload_payload(
        &self,
        library: &mut Library,
        folder: Option<&Folder>,
        upload_option: &str,
    ) -> Result<Map<String, Value>> {
        let folder_id = self.target_folder(library, folder).await?;
        let mut body = Map::new();
        body.insert("folder_id".into(), json!(folder_id));
        body.insert("create_type".into(), json!("file"));
        body.insert("file_type".into(), json!("auto"));
        body.insert("dbkey".into(), json!("?"));
        body.insert("upload_option".into(), json!(upload_option));
        Ok(body)
    }

    async fn finish_upload(&self, library: &mut Library, body: Value) -> Result<Dataset> {
        let lib_id = library.require_id()?.to_string();
        let response = self
            .gi
            .post(&format!("libraries/{}/contents", lib_id), &body)
            .await?;
        self.collect_uploads(library, response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid("upload returned no dataset"))
    }

    async fn collect_uploads(&self, library: &mut Library, response: Value) -> Result<Vec<Dataset>> {
        let created = match response {
            Value::Array(items) => items,
            single @ Value::Object(_) => vec![single],
            other => return Err(Error::invalid(format!("unexpected upload response: {}", other))),
        };
        let mut datasets = Vec::with_capacity(created.len());
        for record in created {
            let id = record_id(&record)?;
            let dataset = self.get_dataset(library, &id).await?;
            library.push_dataset_id(id);
            datasets.push(dataset);
        }
        info!(
            "Uploaded {} dataset(s) to library {}",
            datasets.len(),
            library.id().unwrap_or("?")
        );
        Ok(datasets)
    }
}

pub(crate) fn bool_param(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
