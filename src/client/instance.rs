//! Galaxy Instance
//!
//! Entry point of the client: holds the connection settings and the shared
//! HTTP client, and hands out the per-resource clients.
//!
//! # Example
//!
//! ```rust,no_run
//! use galaxy_objects::client::GalaxyInstance;
//! use galaxy_objects::wrappers::Wrapped;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gi = GalaxyInstance::from_env()?;
//!     let hist = gi.histories().create("analysis").await?;
//!     println!("created history {:?}", hist.id());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use log::debug;
use reqwest::{multipart, Method, RequestBuilder, Response};
use serde_json::Value;

use super::config::GalaxyConfig;
use super::datasets::DatasetClient;
use super::histories::HistoryClient;
use super::libraries::LibraryClient;
use super::workflows::WorkflowClient;
use crate::error::{Error, Result};
use crate::wrappers::Dataset;

/// Connection to one Galaxy server.
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GalaxyInstance {
    config: GalaxyConfig,
    http: reqwest::Client,
}

impl GalaxyInstance {
    /// Creates an instance from explicit settings.
    pub fn new(config: GalaxyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        debug!("Galaxy instance at {}", config.api_url());
        Ok(Self { config, http })
    }

    /// Creates an instance from `GALAXY_URL` / `GALAXY_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(GalaxyConfig::from_env()?)
    }

    pub fn config(&self) -> &GalaxyConfig {
        &self.config
    }

    pub fn libraries(&self) -> LibraryClient<'_> {
        LibraryClient::new(self)
    }

    pub fn histories(&self) -> HistoryClient<'_> {
        HistoryClient::new(self)
    }

    pub fn workflows(&self) -> WorkflowClient<'_> {
        WorkflowClient::new(self)
    }

    pub fn datasets(&self) -> DatasetClient<'_> {
        DatasetClient::new(self)
    }

    /// Polls `datasets` until none is pending; see [`DatasetClient::wait_all`].
    pub async fn wait_datasets(
        &self,
        datasets: &mut [Dataset],
        polling_interval: Option<Duration>,
        break_on_error: bool,
    ) -> Result<()> {
        self.datasets()
            .wait_all(datasets, polling_interval, break_on_error)
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url(), path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        self.http
            .request(method, url)
            .query(&[("key", self.config.api_key.as_str())])
    }

    pub(crate) async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        Self::json_body(path, response).await
    }

    pub(crate) async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::json_body(path, response).await
    }

    pub(crate) async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        Self::json_body(path, response).await
    }

    pub(crate) async fn post_multipart(&self, path: &str, form: multipart::Form) -> Result<Value> {
        let response = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await?;
        Self::json_body(path, response).await
    }

    pub(crate) async fn delete(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut request = self.request(Method::DELETE, path);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        Self::json_body(path, response).await
    }

    /// GET whose body the caller consumes (downloads).
    pub(crate) async fn get_raw(&self, path: &str, query: &[(&str, &str)]) -> Result<Response> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        Self::check_status(path, response).await
    }

    async fn check_status(path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Connection {
            status: status.as_u16(),
            url: path.to_string(),
            body,
        })
    }

    async fn json_body(path: &str, response: Response) -> Result<Value> {
        let response = Self::check_status(path, response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// First element of a list response, or the response itself.
///
/// Several Galaxy endpoints answer a create call with a one-element list.
pub(crate) fn first_record(value: Value) -> Result<Value> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid("empty list in create response")),
        Value::Object(_) => Ok(value),
        other => Err(Error::invalid(format!("expected an object, got {}", other))),
    }
}

/// The `id` of a record, as an owned string.
pub(crate) fn record_id(record: &Value) -> Result<String> {
    record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid(format!("record has no id: {}", record)))
}

/// A list response as a vector of records.
pub(crate) fn record_list(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::invalid(format!("expected a list, got {}", other))),
    }
}
