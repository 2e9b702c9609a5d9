use std::time::Duration;

use analyst_core::SaveRequest;
use analyst_logging::analyst_info;
use thiserror::Error;
use url::Url;

use crate::stream::map_reqwest_error;
use crate::{EngineConfig, StreamError};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save request failed: {0}")]
    Transport(#[from] StreamError),
    #[error("save rejected with http status {0}")]
    HttpStatus(u16),
}

/// Persists a finished result. Callers treat this as best-effort.
#[async_trait::async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, request: &SaveRequest) -> Result<(), SaveError>;
}

#[derive(Debug, Clone)]
pub struct HttpResultStore {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpResultStore {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, StreamError> {
        Ok(Self {
            endpoint,
            client: build_client(timeout)?,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, StreamError> {
        Self::new(config.save_url()?, config.secondary_timeout)
    }
}

#[async_trait::async_trait]
impl ResultStore for HttpResultStore {
    async fn save(&self, request: &SaveRequest) -> Result<(), SaveError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SaveError::HttpStatus(status.as_u16()));
        }
        analyst_info!("Saved analysis '{}' ({} sources)", request.title, request.sources.len());
        Ok(())
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, StreamError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(map_reqwest_error)
}
