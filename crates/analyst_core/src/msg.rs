use std::time::Instant;

use crate::{AnalysisPayload, AnalysisType, JobFailure, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the query text.
    QueryChanged(String),
    /// User edited the report title.
    TitleChanged(String),
    AnalysisTypeChanged(AnalysisType),
    RecommendationsToggled(bool),
    /// User submitted the query.
    SubmitClicked { now: Instant },
    /// User cancelled the running analysis.
    CancelClicked,
    /// Clock tick driving elapsed time and ETA.
    Tick { now: Instant },
    /// A non-terminal frame for a job.
    StreamProgress {
        job_id: JobId,
        percentage: u8,
        step: String,
        message: String,
    },
    /// The terminal success frame for a job.
    StreamCompleted {
        job_id: JobId,
        payload: AnalysisPayload,
        created_at: String,
    },
    /// Transport failure or a terminal failure frame.
    StreamFailed {
        job_id: JobId,
        failure: JobFailure,
        message: String,
    },
    /// Outcome of the fire-and-forget save.
    SaveFinished {
        job_id: JobId,
        outcome: Result<(), String>,
    },
    ExportClicked,
    /// Outcome of an export, with the written file location on success.
    ExportFinished { outcome: Result<String, String> },
    /// User dropped the displayed result.
    DiscardClicked,
    /// User dismissed the notification at this index.
    NotificationDismissed(usize),
    /// Fallback for placeholder wiring.
    NoOp,
}
