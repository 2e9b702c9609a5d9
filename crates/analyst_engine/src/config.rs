use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::{FailureKind, StreamError};

/// Endpoints and transport limits for every backend call the engine makes.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub stream_path: String,
    pub save_path: String,
    pub export_path: String,
    /// The artifact id is appended to this path to download an export.
    pub export_download_path: String,
    pub connect_timeout: Duration,
    /// Optional wall-clock limit for a whole stream; `None` waits for the server.
    pub request_timeout: Option<Duration>,
    /// Timeout for save and export calls.
    pub secondary_timeout: Duration,
    pub download_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            stream_path: "/api/analysis/stream".to_string(),
            save_path: "/api/analysis/save".to_string(),
            export_path: "/api/analysis/export".to_string(),
            export_download_path: "/api/analysis/export/download".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            secondary_timeout: Duration::from_secs(30),
            download_dir: PathBuf::from("downloads"),
        }
    }
}

impl EngineConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn stream_url(&self) -> Result<Url, StreamError> {
        endpoint(&self.base_url, &self.stream_path)
    }

    pub fn save_url(&self) -> Result<Url, StreamError> {
        endpoint(&self.base_url, &self.save_path)
    }

    pub fn export_url(&self) -> Result<Url, StreamError> {
        endpoint(&self.base_url, &self.export_path)
    }

    pub fn export_download_url(&self, artifact_id: &str) -> Result<Url, StreamError> {
        let path = format!(
            "{}/{}",
            self.export_download_path.trim_end_matches('/'),
            artifact_id
        );
        endpoint(&self.base_url, &path)
    }
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> Result<Url, StreamError> {
    let base = Url::parse(base_url)
        .map_err(|err| StreamError::new(FailureKind::InvalidUrl, err.to_string()))?;
    base.join(path)
        .map_err(|err| StreamError::new(FailureKind::InvalidUrl, err.to_string()))
}
