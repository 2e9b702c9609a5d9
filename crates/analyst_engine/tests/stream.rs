use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use analyst_core::{AnalysisRequest, AnalysisType};
use analyst_engine::{
    AnalysisStreamer, EngineEvent, FailureKind, JobProgress, ProgressSink, ReqwestStreamer,
    StreamSettings,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(analyst_logging::initialize_for_tests);
}

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn request() -> AnalysisRequest {
    AnalysisRequest {
        analysis_type: AnalysisType::Financial,
        query: "q".to_string(),
        title: "t".to_string(),
        include_recommendations: false,
        language: "en".to_string(),
        user_id: "u1".to_string(),
    }
}

fn streamer_for(server: &MockServer) -> ReqwestStreamer {
    let settings = StreamSettings {
        endpoint: format!("{}/stream", server.uri()).parse().unwrap(),
        connect_timeout: Duration::from_secs(5),
        request_timeout: None,
    };
    ReqwestStreamer::new(settings).expect("client")
}

async fn serve(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream"))
        .mount(server)
        .await;
}

fn progress_percentages(events: &[EngineEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(JobProgress { percentage, .. }) => Some(*percentage),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn stream_reports_progress_then_returns_payload() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .and(body_partial_json(serde_json::json!({
            "analysisType": "financial",
            "userId": "u1",
            "includeRecommendations": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            concat!(
                "data: {\"progress\":0,\"step\":\"init\",\"message\":\"Starting\"}\n\n",
                "data: {\"progress\":45,\"step\":\"search\",\"message\":\"3 sources found\"}\n\n",
                "data: {\"progress\":100,\"done\":true,\"data\":{\"title\":\"T\",\"content\":\"Body[¹] more\",\"sources\":[{\"id\":1,\"excerptText\":\"x\"}]}}\n\n",
                "data: {\"progress\":100,\"message\":\"after terminal\"}\n\n",
            ),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let payload = streamer_for(&server)
        .run(3, &request(), &sink, &CancellationToken::new())
        .await
        .expect("payload");

    assert_eq!(payload.title, "T");
    assert_eq!(payload.sources.len(), 1);
    let events = sink.take();
    assert_eq!(progress_percentages(&events), vec![0, 45]);
    match &events[1] {
        EngineEvent::Progress(progress) => {
            assert_eq!(progress.job_id, 3);
            assert_eq!(progress.message, "3 sources found");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frames_are_skipped() {
    init_logging();
    let server = MockServer::start().await;
    serve(
        &server,
        concat!(
            "data: {\"progress\":10}\n\n",
            "data: {not json}\n\n",
            "data: {\"progress\":100,\"done\":true,\"data\":{\"content\":\"ok\"}}\n\n",
        ),
    )
    .await;

    let sink = TestSink::default();
    let payload = streamer_for(&server)
        .run(1, &request(), &sink, &CancellationToken::new())
        .await
        .expect("payload");
    assert_eq!(payload.content, "ok");
    assert_eq!(progress_percentages(&sink.take()), vec![10]);
}

#[tokio::test]
async fn failure_frame_stops_reading() {
    init_logging();
    let server = MockServer::start().await;
    serve(
        &server,
        concat!(
            "data: {\"progress\":20}\n\n",
            "data: {\"progress\":20,\"error\":\"model overloaded\"}\n\n",
            "data: {\"progress\":30}\n\n",
        ),
    )
    .await;

    let sink = TestSink::default();
    let err = streamer_for(&server)
        .run(1, &request(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::ServerReported);
    assert_eq!(err.message, "model overloaded");
    assert_eq!(progress_percentages(&sink.take()), vec![20]);
}

#[tokio::test]
async fn http_error_fails_before_streaming() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let err = streamer_for(&server)
        .run(1, &request(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn stream_without_terminal_frame_is_incomplete() {
    init_logging();
    let server = MockServer::start().await;
    serve(&server, "data: {\"progress\":80}\n\n").await;

    let sink = TestSink::default();
    let err = streamer_for(&server)
        .run(1, &request(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::MissingResult);
}

#[tokio::test]
async fn cancellation_aborts_without_events() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_raw("data: {\"progress\":40}\n\n", "text/event-stream"),
        )
        .mount(&server)
        .await;

    let streamer = streamer_for(&server);
    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        streamer.run(1, &request(), &sink, &cancel),
    )
    .await
    .expect("cancel must end the stream promptly")
    .unwrap_err();

    assert!(err.is_cancelled());
    assert!(sink.take().is_empty());
}
