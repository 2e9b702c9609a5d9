use std::fmt;
use std::path::PathBuf;

use analyst_core::{AnalysisPayload, JobId};
use serde::Deserialize;

/// One decoded frame of the progress stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub percentage: u8,
    pub phase: String,
    pub message: String,
    pub done: bool,
    pub failed: bool,
    /// Present only on a terminal frame.
    pub payload: Option<AnalysisPayload>,
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default, alias = "percentage")]
    progress: Option<f64>,
    #[serde(default, alias = "phase")]
    step: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<WireError>,
    /// Kept raw: only the terminal frame's `data` has to be a result object.
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireError {
    Flag(bool),
    Message(String),
}

impl ProgressEvent {
    /// Parses one JSON payload. Unknown fields are ignored and missing ones default.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let wire: WireFrame = serde_json::from_str(json)?;
        let mut message = wire.message.unwrap_or_default();
        let failed = match wire.error {
            Some(WireError::Flag(flag)) => flag,
            Some(WireError::Message(text)) if !text.trim().is_empty() => {
                message = text;
                true
            }
            Some(WireError::Message(_)) | None => false,
        };
        let done = wire.done.unwrap_or(false);
        let percentage = wire
            .progress
            .filter(|p| p.is_finite())
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0);

        let payload = match wire.data {
            Some(data) if done && !data.is_null() => Some(serde_json::from_value(data)?),
            _ => None,
        };

        Ok(Self {
            percentage,
            phase: wire.step.unwrap_or_default(),
            message,
            done,
            failed,
            payload,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.done || self.failed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub percentage: u8,
    pub phase: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(JobProgress),
    /// Terminal outcome of a stream. Never sent for a cancelled job.
    JobCompleted {
        job_id: JobId,
        result: Result<AnalysisPayload, StreamError>,
    },
    ResultSaved {
        job_id: JobId,
        result: Result<(), String>,
    },
    ExportCompleted {
        result: Result<PathBuf, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl StreamError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled by user")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The server sent a terminal failure frame.
    ServerReported,
    /// The stream ended before a terminal frame.
    MissingResult,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::ServerReported => write!(f, "analysis failed"),
            FailureKind::MissingResult => write!(f, "stream ended without result"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
