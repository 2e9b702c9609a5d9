use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::view_model::{Notification, PhaseRowView, Severity};
use crate::{
    classify_speed, estimate_remaining, map_percentage, phase_status, AnalysisPayload,
    AnalysisRequest, AnalysisResult, AnalysisType, AppViewModel, SessionContext, StepKind, PHASES,
};

pub type JobId = u64;

static SOURCES_FOUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s+sources?\b").expect("invalid sources regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    /// A result is on display.
    Completed,
}

/// Why a job stopped without a result. Cancellation is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFailure {
    /// Network error or non-2xx response.
    Transport,
    /// The server sent a terminal failure frame.
    Server,
    /// The stream ended without a terminal frame.
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct RunProgress {
    percentage: u8,
    step: String,
    message: String,
    sources_count: Option<u32>,
    started_at: Option<Instant>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    context: SessionContext,
    query: String,
    title: String,
    analysis_type: AnalysisType,
    include_recommendations: bool,
    session: SessionState,
    next_job_id: JobId,
    current_job: Option<JobId>,
    current_request: Option<AnalysisRequest>,
    progress: RunProgress,
    now: Option<Instant>,
    result: Option<AnalysisResult>,
    result_request: Option<AnalysisRequest>,
    exporting: bool,
    notifications: Vec<Notification>,
    dirty: bool,
}

impl AppState {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            include_recommendations: true,
            ..Self::default()
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.current_job
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn view(&self) -> AppViewModel {
        let percentage = self.progress.percentage;
        let elapsed = self.elapsed();
        let running = self.session == SessionState::Running;
        let phases = PHASES
            .iter()
            .map(|info| PhaseRowView {
                phase: info.phase,
                icon: info.icon,
                label: info.label,
                color: info.color,
                status: phase_status(info.phase, u32::from(percentage)),
            })
            .collect();

        AppViewModel {
            session: self.session,
            query: self.query.clone(),
            analysis_type: self.analysis_type,
            percentage,
            phase: map_percentage(u32::from(percentage)),
            phases,
            step: StepKind::from_tag(&self.progress.step),
            message: self.progress.message.clone(),
            elapsed,
            eta: if running {
                estimate_remaining(elapsed, percentage)
            } else {
                Default::default()
            },
            speed: classify_speed(elapsed, percentage),
            sources_count: self.progress.sources_count,
            result: self.result.clone(),
            exporting: self.exporting,
            notifications: self.notifications.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn elapsed(&self) -> Duration {
        match (self.progress.started_at, self.now) {
            (Some(start), Some(now)) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    pub(crate) fn set_query(&mut self, query: String) {
        self.query = query;
        self.mark_dirty();
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
        self.mark_dirty();
    }

    pub(crate) fn set_analysis_type(&mut self, analysis_type: AnalysisType) {
        self.analysis_type = analysis_type;
        self.mark_dirty();
    }

    pub(crate) fn set_include_recommendations(&mut self, include: bool) {
        self.include_recommendations = include;
        self.mark_dirty();
    }

    /// Allocates a job id and switches to `Running`. `None` when the query is blank.
    pub(crate) fn begin_job(&mut self, now: Instant) -> Option<(JobId, AnalysisRequest)> {
        let query = self.query.trim();
        if query.is_empty() {
            return None;
        }
        let title = match self.title.trim() {
            "" => query.to_string(),
            title => title.to_string(),
        };
        let request = AnalysisRequest {
            analysis_type: self.analysis_type,
            query: query.to_string(),
            title,
            include_recommendations: self.include_recommendations,
            language: self.context.language.clone(),
            user_id: self.context.user_id.clone(),
        };

        self.next_job_id += 1;
        let job_id = self.next_job_id;
        self.current_job = Some(job_id);
        self.current_request = Some(request.clone());
        self.session = SessionState::Running;
        self.progress = RunProgress {
            started_at: Some(now),
            ..RunProgress::default()
        };
        self.now = Some(now);
        self.result = None;
        self.result_request = None;
        self.mark_dirty();
        Some((job_id, request))
    }

    /// Drops the running job and returns to `Idle`.
    pub(crate) fn abandon_job(&mut self) -> Option<JobId> {
        let job_id = self.current_job.take();
        self.current_request = None;
        self.session = SessionState::Idle;
        self.progress = RunProgress::default();
        self.mark_dirty();
        job_id
    }

    pub(crate) fn is_current(&self, job_id: JobId) -> bool {
        self.session == SessionState::Running && self.current_job == Some(job_id)
    }

    /// Advances the clock. Elapsed time freezes once the job leaves `Running`.
    pub(crate) fn tick(&mut self, now: Instant) {
        if self.session == SessionState::Running {
            self.now = Some(now);
            self.mark_dirty();
        }
    }

    pub(crate) fn apply_progress(&mut self, percentage: u8, step: String, message: String) {
        if let Some(count) = parse_sources_count(&message) {
            self.progress.sources_count = Some(count);
        }
        self.progress.percentage = percentage.min(100);
        self.progress.step = step;
        self.progress.message = message;
        self.mark_dirty();
    }

    /// Stores the result and returns the request that produced it.
    pub(crate) fn complete_job(
        &mut self,
        payload: AnalysisPayload,
        created_at: String,
    ) -> Option<(AnalysisRequest, AnalysisResult)> {
        let job_id = self.current_job.take()?;
        let request = self.current_request.take()?;
        let result = AnalysisResult::from_payload(
            format!("analysis-{job_id}"),
            &request.title,
            payload,
            created_at,
        );
        self.session = SessionState::Completed;
        self.progress.percentage = 100;
        self.result = Some(result.clone());
        self.result_request = Some(request.clone());
        self.mark_dirty();
        Some((request, result))
    }

    pub(crate) fn discard_result(&mut self) {
        self.result = None;
        self.result_request = None;
        self.session = SessionState::Idle;
        self.progress = RunProgress::default();
        self.mark_dirty();
    }

    pub(crate) fn save_request_for_export(&self) -> Option<crate::SaveRequest> {
        let result = self.result.as_ref()?;
        let request = self.result_request.as_ref()?;
        Some(crate::SaveRequest::from_result(request, result))
    }

    pub(crate) fn exporting(&self) -> bool {
        self.exporting
    }

    pub(crate) fn set_exporting(&mut self, exporting: bool) {
        self.exporting = exporting;
        self.mark_dirty();
    }

    pub(crate) fn notify(&mut self, severity: Severity, text: impl Into<String>) {
        self.notifications.push(Notification {
            severity,
            text: text.into(),
        });
        self.mark_dirty();
    }

    pub(crate) fn dismiss_notification(&mut self, index: usize) {
        if index < self.notifications.len() {
            self.notifications.remove(index);
            self.mark_dirty();
        }
    }
}

/// Reads `n` out of status messages such as "3 sources found".
pub fn parse_sources_count(message: &str) -> Option<u32> {
    SOURCES_FOUND_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::parse_sources_count;

    #[test]
    fn sources_count_is_read_from_status_message() {
        assert_eq!(parse_sources_count("3 sources found"), Some(3));
        assert_eq!(parse_sources_count("Found 1 source"), Some(1));
        assert_eq!(parse_sources_count("Analyzing 12 Sources now"), Some(12));
        assert_eq!(parse_sources_count("Searching..."), None);
        assert_eq!(parse_sources_count("step 4 of 5"), None);
    }
}
