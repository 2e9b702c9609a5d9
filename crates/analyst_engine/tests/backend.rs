use std::time::Duration;

use analyst_core::{AnalysisType, SaveMetadata, SaveRequest, SourceRecord};
use analyst_engine::{
    export_filename, EngineConfig, ExportError, Exporter, HttpExporter, HttpResultStore,
    ResultStore, SaveError,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn save_request() -> SaveRequest {
    SaveRequest {
        user_id: "u1".to_string(),
        analysis_type: AnalysisType::Risk,
        title: "Quarterly: risk/review".to_string(),
        content: "Body[1]".to_string(),
        sources: vec![SourceRecord::new(1, "excerpt")],
        metadata: SaveMetadata {
            query: "q".to_string(),
            language: "en".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            sources_count: 1,
        },
    }
}

fn config_for(server: &MockServer, download_dir: &std::path::Path) -> EngineConfig {
    EngineConfig {
        download_dir: download_dir.to_path_buf(),
        secondary_timeout: Duration::from_secs(5),
        ..EngineConfig::with_base_url(server.uri())
    }
}

#[tokio::test]
async fn save_posts_result_with_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analysis/save"))
        .and(body_partial_json(serde_json::json!({
            "userId": "u1",
            "analysisType": "risk",
            "metadata": { "sourcesCount": 1, "language": "en" }
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = HttpResultStore::from_config(&config_for(&server, dir.path())).unwrap();
    store.save(&save_request()).await.expect("saved");
}

#[tokio::test]
async fn save_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analysis/save"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = HttpResultStore::from_config(&config_for(&server, dir.path())).unwrap();
    let err = store.save(&save_request()).await.unwrap_err();
    assert!(matches!(err, SaveError::HttpStatus(500)));
}

#[tokio::test]
async fn export_downloads_artifact_into_directory() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analysis/export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "artifactId": 42 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analysis/export/download/42"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 fake".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let exporter = HttpExporter::new(config_for(&server, &dir.path().join("out"))).unwrap();
    let written = exporter.export(&save_request()).await.expect("exported");

    assert_eq!(
        written.file_name().and_then(|n| n.to_str()),
        Some(export_filename("Quarterly: risk/review", "42", "pdf").as_str())
    );
    assert_eq!(std::fs::read(&written).unwrap(), b"%PDF-1.7 fake");
}

#[tokio::test]
async fn export_without_artifact_id_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analysis/export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let exporter = HttpExporter::new(config_for(&server, dir.path())).unwrap();
    let err = exporter.export(&save_request()).await.unwrap_err();
    assert!(matches!(err, ExportError::MissingArtifactId));
}

#[tokio::test]
async fn export_download_failure_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analysis/export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "abc" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/analysis/export/download/abc"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let exporter = HttpExporter::new(config_for(&server, dir.path())).unwrap();
    let err = exporter.export(&save_request()).await.unwrap_err();
    assert!(matches!(err, ExportError::HttpStatus(404)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
