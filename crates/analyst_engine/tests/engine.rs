use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use analyst_core::{
    AnalysisPayload, AnalysisRequest, AnalysisResult, AnalysisType, JobId, SaveRequest,
};
use analyst_engine::{
    AnalysisStreamer, EngineEvent, EngineHandle, ExportError, Exporter, JobProgress, ProgressSink,
    ResultStore, SaveError, StreamError,
};
use tokio_util::sync::CancellationToken;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(analyst_logging::initialize_for_tests);
}

/// Emits one progress event, then waits for `hold` before finishing.
struct ScriptedStreamer {
    hold: Duration,
    started: Arc<Mutex<Vec<JobId>>>,
}

#[async_trait::async_trait]
impl AnalysisStreamer for ScriptedStreamer {
    async fn run(
        &self,
        job_id: JobId,
        request: &AnalysisRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<AnalysisPayload, StreamError> {
        self.started.lock().unwrap().push(job_id);
        sink.emit(EngineEvent::Progress(JobProgress {
            job_id,
            percentage: 10,
            phase: "init".to_string(),
            message: String::new(),
        }));
        tokio::select! {
            _ = cancel.cancelled() => Err(StreamError::cancelled()),
            _ = tokio::time::sleep(self.hold) => Ok(AnalysisPayload {
                title: request.title.clone(),
                content: "done".to_string(),
                ..AnalysisPayload::default()
            }),
        }
    }
}

/// Finishes successfully after `hold` without ever looking at the token.
struct UncooperativeStreamer {
    hold: Duration,
}

#[async_trait::async_trait]
impl AnalysisStreamer for UncooperativeStreamer {
    async fn run(
        &self,
        _job_id: JobId,
        _request: &AnalysisRequest,
        _sink: &dyn ProgressSink,
        _cancel: &CancellationToken,
    ) -> Result<AnalysisPayload, StreamError> {
        tokio::time::sleep(self.hold).await;
        Ok(AnalysisPayload::default())
    }
}

struct OkStore;

#[async_trait::async_trait]
impl ResultStore for OkStore {
    async fn save(&self, _request: &SaveRequest) -> Result<(), SaveError> {
        Ok(())
    }
}

struct NoExport;

#[async_trait::async_trait]
impl Exporter for NoExport {
    async fn export(&self, _request: &SaveRequest) -> Result<PathBuf, ExportError> {
        Err(ExportError::MissingArtifactId)
    }
}

fn handle(hold: Duration) -> (EngineHandle, Arc<Mutex<Vec<JobId>>>) {
    let started = Arc::new(Mutex::new(Vec::new()));
    let streamer = ScriptedStreamer {
        hold,
        started: started.clone(),
    };
    let handle =
        EngineHandle::with_services(Arc::new(streamer), Arc::new(OkStore), Arc::new(NoExport))
            .expect("engine");
    (handle, started)
}

fn request(title: &str) -> AnalysisRequest {
    AnalysisRequest {
        analysis_type: AnalysisType::General,
        query: "q".to_string(),
        title: title.to_string(),
        include_recommendations: true,
        language: "en".to_string(),
        user_id: "u".to_string(),
    }
}

fn drain(handle: &EngineHandle, window: Duration) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Some(event) = handle.recv_timeout(window) {
        events.push(event);
    }
    events
}

fn completed_jobs(events: &[EngineEvent]) -> Vec<JobId> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::JobCompleted { job_id, .. } => Some(*job_id),
            _ => None,
        })
        .collect()
}

#[test]
fn job_runs_to_completion() {
    init_logging();
    let (handle, _) = handle(Duration::from_millis(20));
    handle.start(1, request("first"));

    let events = drain(&handle, Duration::from_millis(500));
    assert!(matches!(events[0], EngineEvent::Progress(JobProgress { job_id: 1, .. })));
    match events.last() {
        Some(EngineEvent::JobCompleted { job_id: 1, result: Ok(payload) }) => {
            assert_eq!(payload.title, "first");
        }
        other => panic!("unexpected final event {other:?}"),
    }
}

#[test]
fn starting_again_aborts_the_previous_job() {
    init_logging();
    let (handle, started) = handle(Duration::from_millis(300));
    handle.start(1, request("first"));
    std::thread::sleep(Duration::from_millis(50));
    handle.start(2, request("second"));

    let events = drain(&handle, Duration::from_millis(800));
    assert_eq!(completed_jobs(&events), vec![2]);
    assert_eq!(*started.lock().unwrap(), vec![1, 2]);
}

#[test]
fn cancelled_job_reports_nothing_further() {
    init_logging();
    let (handle, _) = handle(Duration::from_millis(300));
    handle.start(7, request("doomed"));
    std::thread::sleep(Duration::from_millis(50));
    handle.cancel(7);

    let events = drain(&handle, Duration::from_millis(600));
    assert!(completed_jobs(&events).is_empty());
}

#[test]
fn save_and_export_outcomes_are_reported() {
    init_logging();
    let (handle, _) = handle(Duration::from_millis(10));
    let save = SaveRequest::from_result(
        &request("t"),
        &AnalysisResult::from_payload(
            "id".to_string(),
            "t",
            AnalysisPayload::default(),
            "2024-01-01T00:00:00Z".to_string(),
        ),
    );
    handle.save(3, save.clone());
    handle.export(save);

    let events = drain(&handle, Duration::from_millis(500));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::ResultSaved { job_id: 3, result: Ok(()) })));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::ExportCompleted { result: Err(_) })));
}

#[test]
fn cancelled_job_stays_silent_even_if_stream_succeeds() {
    init_logging();
    let streamer = UncooperativeStreamer {
        hold: Duration::from_millis(150),
    };
    let handle =
        EngineHandle::with_services(Arc::new(streamer), Arc::new(OkStore), Arc::new(NoExport))
            .expect("engine");
    handle.start(9, request("late"));
    std::thread::sleep(Duration::from_millis(30));
    handle.cancel(9);

    let events = drain(&handle, Duration::from_millis(500));
    assert!(completed_jobs(&events).is_empty(), "{events:?}");
}
