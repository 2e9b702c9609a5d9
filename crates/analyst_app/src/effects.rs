use std::time::Duration;

use analyst_core::{Effect, JobFailure, Msg};
use analyst_engine::{EngineEvent, EngineHandle, FailureKind};
use analyst_logging::{analyst_info, analyst_warn};
use chrono::Utc;

/// Hands effects to the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartAnalysis { job_id, request } => {
                    analyst_info!(
                        "StartAnalysis job_id={} type={} query_len={}",
                        job_id,
                        request.analysis_type.as_tag(),
                        request.query.len()
                    );
                    self.engine.start(job_id, request);
                }
                Effect::CancelAnalysis { job_id } => {
                    self.engine.cancel(job_id);
                }
                Effect::SaveResult { job_id, request } => {
                    self.engine.save(job_id, request);
                }
                Effect::ExportResult { request } => {
                    self.engine.export(request);
                }
            }
        }
    }

    /// Waits up to `timeout` for the next engine event that maps to a message.
    pub fn poll(&self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).and_then(event_to_msg)
    }
}

pub fn event_to_msg(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Progress(progress) => Some(Msg::StreamProgress {
            job_id: progress.job_id,
            percentage: progress.percentage,
            step: progress.phase,
            message: progress.message,
        }),
        EngineEvent::JobCompleted { job_id, result } => match result {
            Ok(payload) => Some(Msg::StreamCompleted {
                job_id,
                payload,
                created_at: Utc::now().to_rfc3339(),
            }),
            Err(err) => {
                let failure = map_failure(err.kind)?;
                analyst_warn!("Job {} failed: {}", job_id, err);
                Some(Msg::StreamFailed {
                    job_id,
                    failure,
                    message: err.message,
                })
            }
        },
        EngineEvent::ResultSaved { job_id, result } => Some(Msg::SaveFinished {
            job_id,
            outcome: result,
        }),
        EngineEvent::ExportCompleted { result } => Some(Msg::ExportFinished {
            outcome: result.map(|path| path.display().to_string()),
        }),
    }
}

/// `None` for cancellation, which is never surfaced as a failure.
fn map_failure(kind: FailureKind) -> Option<JobFailure> {
    match kind {
        FailureKind::InvalidUrl
        | FailureKind::HttpStatus(_)
        | FailureKind::Timeout
        | FailureKind::Network => Some(JobFailure::Transport),
        FailureKind::ServerReported => Some(JobFailure::Server),
        FailureKind::MissingResult => Some(JobFailure::Incomplete),
        FailureKind::Cancelled => None,
    }
}
