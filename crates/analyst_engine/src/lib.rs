//! Analyst engine: streaming controller, backend clients and citation rendering.
mod config;
mod download;
mod engine;
mod export;
mod frame;
mod render;
mod save;
mod stream;
mod types;

pub use config::EngineConfig;
pub use download::{ensure_download_dir, export_filename, DownloadError, DownloadWriter};
pub use engine::{EngineError, EngineHandle};
pub use export::{ExportError, Exporter, HttpExporter};
pub use frame::FrameDecoder;
pub use render::{
    escape_html, CitationBadge, CitationRenderer, HoverPreview, HtmlCitationRenderer,
    RenderedMessage,
};
pub use save::{HttpResultStore, ResultStore, SaveError};
pub use stream::{
    AnalysisStreamer, ChannelProgressSink, ProgressSink, ReqwestStreamer, StreamSettings,
};
pub use types::{EngineEvent, FailureKind, JobProgress, ProgressEvent, StreamError};
