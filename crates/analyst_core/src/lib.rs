//! Analyst core: pure state machine, progress phases and citation handling.
pub mod citation;
mod effect;
mod msg;
mod phase;
mod placement;
mod request;
mod source;
mod state;
mod timing;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use phase::{
    map_percentage, phase_status, PhaseColor, PhaseInfo, PhaseStatus, ProgressPhase, StepKind,
    PHASES,
};
pub use placement::{preview_placement, PreviewPlacement, PREVIEW_FLIP_MARGIN_PX};
pub use request::{AnalysisRequest, AnalysisType, SaveMetadata, SaveRequest, SessionContext};
pub use source::{
    truncate_excerpt, AnalysisPayload, AnalysisResult, RelevanceTier, SourceRecord,
    EXCERPT_PREVIEW_CHARS,
};
pub use state::{parse_sources_count, AppState, JobFailure, JobId, SessionState};
pub use timing::{
    classify_speed, estimate_remaining, format_duration, Eta, SpeedClass, FAST_RATE, SLOW_RATE,
};
pub use update::update;
pub use view_model::{AppViewModel, Notification, PhaseRowView, Severity};
