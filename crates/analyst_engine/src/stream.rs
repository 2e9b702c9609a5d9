use std::time::Duration;

use analyst_core::{AnalysisPayload, AnalysisRequest, JobId};
use analyst_logging::{analyst_debug, analyst_info};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::frame::FrameDecoder;
use crate::{EngineConfig, EngineEvent, FailureKind, JobProgress, ProgressEvent, StreamError};

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub endpoint: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Option<Duration>,
}

impl StreamSettings {
    pub fn from_config(config: &EngineConfig) -> Result<Self, StreamError> {
        Ok(Self {
            endpoint: config.stream_url()?,
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
        })
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Runs one analysis stream to its terminal frame.
///
/// Non-terminal frames go to `sink` as [`EngineEvent::Progress`]; the terminal
/// outcome is the return value. Once `cancel` fires nothing more is emitted
/// and the call returns a [`FailureKind::Cancelled`] error.
#[async_trait::async_trait]
pub trait AnalysisStreamer: Send + Sync {
    async fn run(
        &self,
        job_id: JobId,
        request: &AnalysisRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<AnalysisPayload, StreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestStreamer {
    settings: StreamSettings,
    client: reqwest::Client,
}

impl ReqwestStreamer {
    pub fn new(settings: StreamSettings) -> Result<Self, StreamError> {
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| StreamError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }
}

#[async_trait::async_trait]
impl AnalysisStreamer for ReqwestStreamer {
    async fn run(
        &self,
        job_id: JobId,
        request: &AnalysisRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<AnalysisPayload, StreamError> {
        let send = self
            .client
            .post(self.settings.endpoint.clone())
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::cancelled()),
            response = send => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        analyst_info!("Stream opened job_id={} status={}", job_id, status);

        let mut decoder = FrameDecoder::new();
        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamError::cancelled()),
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk: Bytes = chunk.map_err(map_reqwest_error)?;
            for event in decoder.push(&chunk) {
                if let Some(payload) = dispatch(job_id, event, sink)? {
                    return Ok(payload);
                }
            }
        }

        for event in decoder.finish() {
            if let Some(payload) = dispatch(job_id, event, sink)? {
                return Ok(payload);
            }
        }

        Err(StreamError::new(
            FailureKind::MissingResult,
            "stream closed before the analysis finished",
        ))
    }
}

/// Forwards a non-terminal frame, or turns a terminal one into the outcome.
fn dispatch(
    job_id: JobId,
    event: ProgressEvent,
    sink: &dyn ProgressSink,
) -> Result<Option<AnalysisPayload>, StreamError> {
    if event.failed {
        return Err(StreamError::new(FailureKind::ServerReported, event.message));
    }
    if event.done {
        analyst_debug!("Terminal frame job_id={}", job_id);
        return match event.payload {
            Some(payload) => Ok(Some(payload)),
            None => Err(StreamError::new(
                FailureKind::MissingResult,
                "terminal frame carried no result",
            )),
        };
    }
    sink.emit(EngineEvent::Progress(JobProgress {
        job_id,
        percentage: event.percentage,
        phase: event.phase,
        message: event.message,
    }));
    Ok(None)
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return StreamError::new(FailureKind::InvalidUrl, err.to_string());
    }
    StreamError::new(FailureKind::Network, err.to_string())
}
