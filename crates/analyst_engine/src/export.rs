use std::path::PathBuf;

use analyst_core::SaveRequest;
use analyst_logging::analyst_info;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::download::{export_filename, DownloadError, DownloadWriter};
use crate::save::build_client;
use crate::stream::map_reqwest_error;
use crate::{EngineConfig, StreamError};

const EXPORT_EXTENSION: &str = "pdf";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export request failed: {0}")]
    Transport(#[from] StreamError),
    #[error("export rejected with http status {0}")]
    HttpStatus(u16),
    #[error("export response carried no artifact id")]
    MissingArtifactId,
    #[error("could not store export: {0}")]
    Download(#[from] DownloadError),
}

/// Turns a result into a downloadable artifact on disk.
#[async_trait::async_trait]
pub trait Exporter: Send + Sync {
    async fn export(&self, request: &SaveRequest) -> Result<PathBuf, ExportError>;
}

#[derive(Debug, Deserialize)]
struct ArtifactResponse {
    #[serde(default, alias = "artifactId", alias = "exportId")]
    id: Option<serde_json::Value>,
}

impl ArtifactResponse {
    fn artifact_id(&self) -> Option<String> {
        match &self.id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// POSTs the result to obtain an artifact id, then GETs the binary by that id.
#[derive(Debug, Clone)]
pub struct HttpExporter {
    config: EngineConfig,
    client: reqwest::Client,
    writer: DownloadWriter,
}

impl HttpExporter {
    pub fn new(config: EngineConfig) -> Result<Self, StreamError> {
        // Fail early on a bad base url rather than on first export.
        config.export_url()?;
        let client = build_client(config.secondary_timeout)?;
        let writer = DownloadWriter::new(config.download_dir.clone());
        Ok(Self {
            config,
            client,
            writer,
        })
    }

    async fn create_artifact(&self, request: &SaveRequest) -> Result<String, ExportError> {
        let response = self
            .client
            .post(self.config.export_url()?)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::HttpStatus(status.as_u16()));
        }
        let body: ArtifactResponse = response.json().await.map_err(map_reqwest_error)?;
        body.artifact_id().ok_or(ExportError::MissingArtifactId)
    }

    async fn fetch_artifact(&self, artifact_id: &str) -> Result<Bytes, ExportError> {
        let response = self
            .client
            .get(self.config.export_download_url(artifact_id)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExportError::HttpStatus(status.as_u16()));
        }
        Ok(response.bytes().await.map_err(map_reqwest_error)?)
    }
}

#[async_trait::async_trait]
impl Exporter for HttpExporter {
    async fn export(&self, request: &SaveRequest) -> Result<PathBuf, ExportError> {
        let artifact_id = self.create_artifact(request).await?;
        let bytes = self.fetch_artifact(&artifact_id).await?;
        let filename = export_filename(&request.title, &artifact_id, EXPORT_EXTENSION);
        let path = self.writer.write(&filename, &bytes)?;
        analyst_info!(
            "Exported '{}' ({} bytes) to {:?}",
            request.title,
            bytes.len(),
            path
        );
        Ok(path)
    }
}
