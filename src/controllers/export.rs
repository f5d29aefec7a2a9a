//! JSON and binary export of the user set.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::client::UserApi;
use crate::decoder::Decoder;
use crate::error::{AdminError, Result};
use crate::types::{DecodedCollection, ExportMetadata};

pub const JSON_EXTENSION: &str = "json";
pub const BINARY_EXTENSION: &str = "pb";

/// Destination for finished exports.
pub trait DownloadSink {
    /// Store the full payload under `filename`, returning where it went.
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Saves exports into a directory.
///
/// Bytes go to a temporary file in the same directory, which is renamed into
/// place only once fully written.
pub struct FileDownloads {
    dir: PathBuf,
}

impl FileDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for FileDownloads {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.dir.join(filename);
        let save_err = |source: std::io::Error| AdminError::Save {
            path: target.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(save_err)?;
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(save_err)?;
        temp.write_all(bytes).map_err(save_err)?;
        temp.as_file().sync_all().map_err(save_err)?;
        temp.persist(&target).map_err(|e| save_err(e.error))?;

        Ok(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Exporting,
    Success,
    Error(String),
}

/// `users-export-2025-05-01.json`
pub fn export_filename(date: NaiveDate, extension: &str) -> String {
    format!("users-export-{}.{extension}", date.format("%Y-%m-%d"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub struct Exporter<'a, A: UserApi + ?Sized, S: DownloadSink> {
    api: &'a A,
    sink: S,
    decoder: &'a Decoder,
    state: ExportState,
    metadata: Option<ExportMetadata>,
    saved: Option<PathBuf>,
}

impl<'a, A: UserApi + ?Sized, S: DownloadSink> Exporter<'a, A, S> {
    pub fn new(api: &'a A, sink: S, decoder: &'a Decoder) -> Self {
        Self {
            api,
            sink,
            decoder,
            state: ExportState::Idle,
            metadata: None,
            saved: None,
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Header metadata of the last binary export.
    pub fn metadata(&self) -> Option<&ExportMetadata> {
        self.metadata.as_ref()
    }

    pub fn saved_path(&self) -> Option<&Path> {
        self.saved.as_deref()
    }

    pub async fn export_json(&mut self) -> Result<PathBuf> {
        self.state = ExportState::Exporting;
        let result = self.try_export_json().await;
        self.finish(result)
    }

    async fn try_export_json(&mut self) -> Result<PathBuf> {
        let users = self.api.export_json().await?;
        let body = serde_json::to_string_pretty(&users)?;
        let path = self
            .sink
            .save(&export_filename(today(), JSON_EXTENSION), body.as_bytes())?;

        tracing::info!(users = users.len(), path = %path.display(), "json export saved");
        Ok(path)
    }

    pub async fn export_binary(&mut self) -> Result<PathBuf> {
        self.state = ExportState::Exporting;
        let result = self.try_export_binary().await;
        self.finish(result)
    }

    async fn try_export_binary(&mut self) -> Result<PathBuf> {
        let export = self.api.export_binary().await?;
        let path = self
            .sink
            .save(&export_filename(today(), BINARY_EXTENSION), &export.bytes)?;

        tracing::info!(
            bytes = export.bytes.len(),
            advertised_count = ?export.metadata.count,
            path = %path.display(),
            "binary export saved"
        );
        self.metadata = Some(export.metadata);
        Ok(path)
    }

    /// Fetch the binary export again and decode it for display instead of
    /// saving it.
    pub async fn decode_and_display(&mut self) -> Result<DecodedCollection> {
        self.state = ExportState::Exporting;

        match self.try_decode().await {
            Ok(collection) => {
                self.state = ExportState::Success;
                Ok(collection)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    async fn try_decode(&mut self) -> Result<DecodedCollection> {
        let export = self.api.export_binary().await?;
        self.metadata = Some(export.metadata);
        Ok(self.decoder.decode_collection(&export.bytes).await?)
    }

    fn finish(&mut self, result: Result<PathBuf>) -> Result<PathBuf> {
        match result {
            Ok(path) => {
                self.state = ExportState::Success;
                self.saved = Some(path.clone());
                Ok(path)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    fn record_failure(&mut self, err: AdminError) -> AdminError {
        tracing::warn!(error = %err, "export failed");
        self.state = ExportState::Error(err.to_string());
        err
    }
}
