use analyst_logging::{analyst_debug, analyst_info};

use crate::view_model::Severity;
use crate::{AppState, Effect, JobFailure, Msg, SaveRequest, SessionState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::QueryChanged(query) => {
            state.set_query(query);
            Vec::new()
        }
        Msg::TitleChanged(title) => {
            state.set_title(title);
            Vec::new()
        }
        Msg::AnalysisTypeChanged(analysis_type) => {
            state.set_analysis_type(analysis_type);
            Vec::new()
        }
        Msg::RecommendationsToggled(include) => {
            state.set_include_recommendations(include);
            Vec::new()
        }
        Msg::SubmitClicked { now } => {
            // At most one stream in flight: a running job is cancelled first.
            let previous = if state.session() == SessionState::Running {
                state.abandon_job()
            } else {
                None
            };
            let mut effects = Vec::with_capacity(2);
            if let Some(job_id) = previous {
                effects.push(Effect::CancelAnalysis { job_id });
            }
            match state.begin_job(now) {
                Some((job_id, request)) => {
                    analyst_info!("Starting analysis job_id={}", job_id);
                    effects.push(Effect::StartAnalysis { job_id, request });
                }
                None => state.notify(Severity::Warning, "Enter a query to analyze."),
            }
            effects
        }
        Msg::CancelClicked => {
            if state.session() == SessionState::Running {
                match state.abandon_job() {
                    Some(job_id) => vec![Effect::CancelAnalysis { job_id }],
                    None => Vec::new(),
                }
            } else {
                Vec::new()
            }
        }
        Msg::Tick { now } => {
            state.tick(now);
            Vec::new()
        }
        Msg::StreamProgress {
            job_id,
            percentage,
            step,
            message,
        } => {
            if state.is_current(job_id) {
                state.apply_progress(percentage, step, message);
            } else {
                analyst_debug!("Ignoring progress for stale job_id={}", job_id);
            }
            Vec::new()
        }
        Msg::StreamCompleted {
            job_id,
            payload,
            created_at,
        } => {
            if !state.is_current(job_id) {
                analyst_debug!("Ignoring completion for stale job_id={}", job_id);
                return (state, Vec::new());
            }
            match state.complete_job(payload, created_at) {
                Some((request, result)) => vec![Effect::SaveResult {
                    job_id,
                    request: SaveRequest::from_result(&request, &result),
                }],
                None => Vec::new(),
            }
        }
        Msg::StreamFailed {
            job_id,
            failure,
            message,
        } => {
            if state.is_current(job_id) {
                state.abandon_job();
                state.notify(Severity::Error, failure_text(failure, &message));
            }
            Vec::new()
        }
        Msg::SaveFinished { job_id, outcome } => {
            if let Err(err) = outcome {
                state.notify(
                    Severity::Warning,
                    format!("Analysis {job_id} could not be saved: {err}"),
                );
            }
            Vec::new()
        }
        Msg::ExportClicked => {
            if state.exporting() {
                return (state, Vec::new());
            }
            match state.save_request_for_export() {
                Some(request) => {
                    state.set_exporting(true);
                    vec![Effect::ExportResult { request }]
                }
                None => Vec::new(),
            }
        }
        Msg::ExportFinished { outcome } => {
            state.set_exporting(false);
            match outcome {
                Ok(location) => state.notify(Severity::Info, format!("Exported to {location}")),
                Err(err) => state.notify(Severity::Error, format!("Export failed: {err}")),
            }
            Vec::new()
        }
        Msg::DiscardClicked => {
            if state.session() == SessionState::Completed {
                state.discard_result();
            }
            Vec::new()
        }
        Msg::NotificationDismissed(index) => {
            state.dismiss_notification(index);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn failure_text(failure: JobFailure, message: &str) -> String {
    let message = message.trim();
    match failure {
        JobFailure::Server if !message.is_empty() => message.to_string(),
        JobFailure::Server => "The analysis failed on the server.".to_string(),
        JobFailure::Transport => format!("Could not reach the analysis service: {message}"),
        JobFailure::Incomplete => "The analysis stream ended before a result arrived.".to_string(),
    }
}
