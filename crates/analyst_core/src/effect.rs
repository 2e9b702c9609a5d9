use crate::{AnalysisRequest, JobId, SaveRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a progress stream for `job_id`.
    StartAnalysis { job_id: JobId, request: AnalysisRequest },
    /// Abort the stream of `job_id`, if it is still open.
    CancelAnalysis { job_id: JobId },
    /// Best-effort persistence; the outcome never changes the displayed result.
    SaveResult { job_id: JobId, request: SaveRequest },
    ExportResult { request: SaveRequest },
}
