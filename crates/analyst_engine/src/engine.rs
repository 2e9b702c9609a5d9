use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use analyst_core::{AnalysisRequest, JobId, SaveRequest};
use analyst_logging::{analyst_info, analyst_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::export::{Exporter, HttpExporter};
use crate::save::{HttpResultStore, ResultStore};
use crate::stream::{AnalysisStreamer, ChannelProgressSink, ReqwestStreamer, StreamSettings};
use crate::{EngineConfig, EngineEvent, StreamError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid engine configuration: {0}")]
    Config(#[from] StreamError),
}

enum EngineCommand {
    Start {
        job_id: JobId,
        request: AnalysisRequest,
    },
    Cancel {
        job_id: JobId,
    },
    Save {
        job_id: JobId,
        request: SaveRequest,
    },
    Export {
        request: SaveRequest,
    },
}

/// The single mutable "current stream" reference. Starting a job aborts the previous one.
#[derive(Default)]
pub(crate) struct StreamSlot {
    current: Option<(JobId, CancellationToken)>,
}

impl StreamSlot {
    /// Installs a fresh token for `job_id`, cancelling whatever was in flight.
    pub(crate) fn replace(&mut self, job_id: JobId) -> CancellationToken {
        if let Some((previous, token)) = self.current.take() {
            analyst_info!("Aborting job_id={} for job_id={}", previous, job_id);
            token.cancel();
        }
        let token = CancellationToken::new();
        self.current = Some((job_id, token.clone()));
        token
    }

    /// Cancels `job_id` if it is the one in flight. Returns whether it was.
    pub(crate) fn cancel(&mut self, job_id: JobId) -> bool {
        match &self.current {
            Some((current, token)) if *current == job_id => {
                token.cancel();
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

/// Background runtime owning the network side. Commands go in, [`EngineEvent`]s come out.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let streamer = ReqwestStreamer::new(StreamSettings::from_config(&config)?)?;
        let store = HttpResultStore::from_config(&config)?;
        let exporter = HttpExporter::new(config)?;
        Self::with_services(Arc::new(streamer), Arc::new(store), Arc::new(exporter))
    }

    pub fn with_services(
        streamer: Arc<dyn AnalysisStreamer>,
        store: Arc<dyn ResultStore>,
        exporter: Arc<dyn Exporter>,
    ) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            let mut slot = StreamSlot::default();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Start { job_id, request } => {
                        let cancel = slot.replace(job_id);
                        let streamer = streamer.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_stream(streamer.as_ref(), job_id, request, cancel, event_tx).await;
                        });
                    }
                    EngineCommand::Cancel { job_id } => {
                        if slot.cancel(job_id) {
                            analyst_info!("Cancelled job_id={}", job_id);
                        }
                    }
                    EngineCommand::Save { job_id, request } => {
                        let store = store.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = store.save(&request).await.map_err(|err| {
                                analyst_warn!("Save for job_id={} failed: {}", job_id, err);
                                err.to_string()
                            });
                            let _ = event_tx.send(EngineEvent::ResultSaved { job_id, result });
                        });
                    }
                    EngineCommand::Export { request } => {
                        let exporter = exporter.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = exporter.export(&request).await.map_err(|err| {
                                analyst_warn!("Export of '{}' failed: {}", request.title, err);
                                err.to_string()
                            });
                            let _ = event_tx.send(EngineEvent::ExportCompleted { result });
                        });
                    }
                }
            }
            // Dropping the runtime aborts whatever is still in flight.
            drop(runtime);
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn start(&self, job_id: JobId, request: AnalysisRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Start { job_id, request });
    }

    pub fn cancel(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { job_id });
    }

    /// Fire-and-forget save; the outcome arrives later as [`EngineEvent::ResultSaved`].
    pub fn save(&self, job_id: JobId, request: SaveRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Save { job_id, request });
    }

    pub fn export(&self, request: SaveRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Export { request });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn run_stream(
    streamer: &dyn AnalysisStreamer,
    job_id: JobId,
    request: AnalysisRequest,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let result = streamer.run(job_id, &request, &sink, &cancel).await;
    match result {
        // A job cancelled while finishing stays silent, whatever it returned.
        _ if cancel.is_cancelled() => {
            analyst_info!("Stream for job_id={} stopped after cancel", job_id);
        }
        Err(err) if err.is_cancelled() => {
            analyst_info!("Stream for job_id={} reported cancellation", job_id);
        }
        result => {
            if let Err(err) = &result {
                analyst_warn!("Stream for job_id={} failed: {}", job_id, err);
            }
            let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
        }
    }
}
