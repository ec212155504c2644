//! Dataset state polling and content download.

use std::time::{Duration, Instant};

use log::{debug, warn};
use reqwest::Response;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::instance::GalaxyInstance;
use crate::error::{Error, Result};
use crate::wrappers::{Dataset, DatasetKind, Wrapped};

/// Default size of the chunks yielded by [`DatasetStream`].
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Dataset operations of one [`GalaxyInstance`].
pub struct DatasetClient<'a> {
    gi: &'a GalaxyInstance,
}

impl<'a> DatasetClient<'a> {
    pub(crate) fn new(gi: &'a GalaxyInstance) -> Self {
        Self { gi }
    }

    /// Reloads the dataset record from its library or history.
    pub async fn refresh(&self, dataset: &mut Dataset) -> Result<()> {
        let id = dataset.require_id()?.to_string();
        let container = match dataset.kind() {
            DatasetKind::Library => "libraries",
            DatasetKind::History => "histories",
        };
        let record = self
            .gi
            .get(
                &format!("{}/{}/contents/{}", container, dataset.container_id(), id),
                &[],
            )
            .await?;
        dataset.refresh_from(record)
    }

    /// Polls until the dataset leaves the pending states.
    ///
    /// Fails with [`Error::DatasetFailed`] if it ends in an error state and
    /// with [`Error::Timeout`] once `timeout` has elapsed.
    pub async fn wait(
        &self,
        dataset: &mut Dataset,
        polling_interval: Option<Duration>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let interval = polling_interval.unwrap_or_else(|| self.gi.config().polling_interval());
        let started = Instant::now();
        loop {
            self.refresh(dataset).await?;
            match dataset.state() {
                Some(state) if state.is_pending() => {
                    debug!("Dataset {:?} is {}", dataset.id(), state);
                }
                Some(state) if state.is_error() => {
                    return Err(Error::DatasetFailed {
                        id: dataset.id().unwrap_or_default().to_string(),
                        state: state.to_string(),
                    });
                }
                _ => return Ok(()),
            }
            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return Err(Error::Timeout(format!(
                        "dataset {} still pending after {:?}",
                        dataset.id().unwrap_or_default(),
                        limit
                    )));
                }
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Polls a set of datasets until none is pending.
    ///
    /// With `break_on_error`, the first dataset found in an error state
    /// aborts the wait; otherwise failures are logged and waiting goes on.
    pub async fn wait_all(
        &self,
        datasets: &mut [Dataset],
        polling_interval: Option<Duration>,
        break_on_error: bool,
    ) -> Result<()> {
        let interval = polling_interval.unwrap_or_else(|| self.gi.config().polling_interval());
        let mut reported = vec![false; datasets.len()];
        loop {
            let mut pending = 0;
            for (dataset, reported) in datasets.iter_mut().zip(reported.iter_mut()) {
                // Settled datasets keep their state; only pending ones are re-read.
                if dataset.state().map_or(true, |s| s.is_pending()) {
                    self.refresh(dataset).await?;
                }
                match dataset.state() {
                    Some(state) if state.is_pending() => pending += 1,
                    Some(state) if state.is_error() => {
                        let id = dataset.id().unwrap_or_default().to_string();
                        if break_on_error {
                            return Err(Error::DatasetFailed {
                                id,
                                state: state.to_string(),
                            });
                        }
                        if !*reported {
                            warn!("Dataset {} ended in state {}", id, state);
                            *reported = true;
                        }
                    }
                    _ => {}
                }
            }
            if pending == 0 {
                return Ok(());
            }
            debug!("Waiting for {} dataset(s)", pending);
            tokio::time::sleep(interval).await;
        }
    }

    /// Opens the dataset content for chunked reading.
    pub async fn get_stream(&self, dataset: &Dataset, chunk_size: usize) -> Result<DatasetStream> {
        let response = self.display(dataset).await?;
        Ok(DatasetStream::new(response, chunk_size))
    }

    /// First chunk of the content, empty for an empty dataset.
    pub async fn peek(&self, dataset: &Dataset, chunk_size: usize) -> Result<Vec<u8>> {
        let mut stream = self.get_stream(dataset, chunk_size).await?;
        Ok(stream.next_chunk().await?.unwrap_or_default())
    }

    /// Writes the whole content to `writer` and returns the byte count.
    pub async fn download<W>(&self, dataset: &Dataset, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut stream = self.get_stream(dataset, DEFAULT_CHUNK_SIZE).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next_chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Whole content as bytes.
    pub async fn get_contents(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        let response = self.display(dataset).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn display(&self, dataset: &Dataset) -> Result<Response> {
        let id = dataset
            .display_id()
            .ok_or_else(|| Error::NotMapped(dataset.wrapper().kind().to_string()))?;
        let mut query = vec![("hda_ldda", dataset.kind().hda_ldda())];
        if let Some(ext) = dataset.file_ext() {
            query.push(("to_ext", ext));
        }
        self.gi
            .get_raw(&format!("datasets/{}/display", id), &query)
            .await
    }
}

/// Dataset content read in fixed-size chunks.
///
/// Every chunk but the last has exactly `chunk_size` bytes, regardless of
/// how the server splits its response.
pub struct DatasetStream {
    response: Response,
    chunk_size: usize,
    buffer: Vec<u8>,
    done: bool,
}

impl DatasetStream {
    fn new(response: Response, chunk_size: usize) -> Self {
        Self {
            response,
            chunk_size: chunk_size.max(1),
            buffer: Vec::new(),
            done: false,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Next chunk, or `None` at the end of the content.
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        while !self.done && self.buffer.len() < self.chunk_size {
            match self.response.chunk().await? {
                Some(bytes) => self.buffer.extend_from_slice(&bytes),
                None => self.done = true,
            }
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let take = self.chunk_size.min(self.buffer.len());
        let rest = self.buffer.split_off(take);
        Ok(Some(std::mem::replace(&mut self.buffer, rest)))
    }
}
