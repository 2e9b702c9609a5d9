use std::time::Duration;

use crate::{
    AnalysisResult, AnalysisType, Eta, PhaseColor, PhaseStatus, ProgressPhase, SessionState,
    SpeedClass, StepKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Transient, dismissable message. Never blocks further use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub session: SessionState,
    pub query: String,
    pub analysis_type: AnalysisType,
    pub percentage: u8,
    pub phase: ProgressPhase,
    pub phases: Vec<PhaseRowView>,
    pub step: StepKind,
    pub message: String,
    pub elapsed: Duration,
    pub eta: Eta,
    pub speed: SpeedClass,
    pub sources_count: Option<u32>,
    pub result: Option<AnalysisResult>,
    pub exporting: bool,
    pub notifications: Vec<Notification>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRowView {
    pub phase: ProgressPhase,
    pub icon: &'static str,
    pub label: &'static str,
    pub color: PhaseColor,
    pub status: PhaseStatus,
}
