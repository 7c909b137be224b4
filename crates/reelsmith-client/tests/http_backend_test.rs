//! Contract tests for the HTTP backend against a mock server.

use reelsmith_client::{ClientConfig, HttpBackend};
use reelsmith_core::{
    AnalyzeResponse, Error, GenerateResponse, GenerationRequest, JobBackend, ProgressStatus,
    Resolution,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> HttpBackend {
    HttpBackend::new(ClientConfig::default().with_base_url(server.uri()))
        .expect("Failed to create backend")
}

fn sample_request() -> GenerationRequest {
    GenerationRequest {
        image_paths: (0..10).map(|i| format!("/photos/{}.jpg", i)).collect(),
        output_path: "output.mp4".to_string(),
        resolution: Resolution::Portrait,
        audio_path: "/music/song.mp3".to_string(),
        audio_start: 10.0,
        audio_end: 100.0,
        image_duration: 3.0,
        title_text: "Trip".to_string(),
        ken_burns_effect: None,
    }
}

#[tokio::test]
async fn test_start_analysis_sends_folder_paths() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .and(body_json(json!({"folder_paths": ["/pics/a", "/pics/b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let folders = vec!["/pics/a".to_string(), "/pics/b".to_string()];
    let response = backend.start_analysis(&folders).await.unwrap();

    assert_eq!(response, AnalyzeResponse::Started);
}

#[tokio::test]
async fn test_start_analysis_immediate_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"path": "/pics/1.jpg", "tags": ["beach"]}],
            "people": [],
            "themes": [{"name": "beach", "count": 1}]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let response = backend.start_analysis(&["/pics".to_string()]).await.unwrap();

    match response {
        AnalyzeResponse::Completed(payload) => {
            assert_eq!(payload.results.len(), 1);
            assert_eq!(payload.themes.len(), 1);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_start_generation_body_shape() {
    let server = MockServer::start().await;

    let expected = serde_json::to_value(sample_request()).unwrap();
    assert_eq!(expected["resolution"], json!("9:16"));
    assert!(expected.get("ken_burns_effect").is_none());

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let response = backend.start_generation(&sample_request()).await.unwrap();
    assert_eq!(response, GenerateResponse::Started);
}

#[tokio::test]
async fn test_error_status_with_json_body_is_honoured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"status": "error", "message": "disk full"})),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let response = backend.start_generation(&sample_request()).await.unwrap();
    assert_eq!(
        response,
        GenerateResponse::Failed {
            message: Some("disk full".to_string())
        }
    );
}

#[tokio::test]
async fn test_non_json_body_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/progress"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.progress().await.unwrap_err();
    assert!(matches!(err, Error::Request(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_progress_parsing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "percent": 100,
            "message": "done",
            "result": {"results": [], "people": [], "themes": []}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let report = backend.progress().await.unwrap();
    assert_eq!(report.status, ProgressStatus::Completed);
    assert_eq!(report.clamped_percent(), 100.0);
    assert!(report.result.is_some());
}

#[tokio::test]
async fn test_browse_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/browse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"path": "/pics/new"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/browse_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"path": null})))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert_eq!(
        backend.browse_folder().await.unwrap(),
        Some("/pics/new".to_string())
    );
    assert_eq!(backend.browse_file().await.unwrap(), None);
}

#[tokio::test]
async fn test_fetch_media() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/image"))
        .and(query_param("path", "/music/song.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/image"))
        .and(query_param("path", "/missing.mp3"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    assert_eq!(
        backend.fetch_media("/music/song.mp3").await.unwrap(),
        vec![1, 2, 3]
    );
    assert!(matches!(
        backend.fetch_media("/missing.mp3").await,
        Err(Error::Request(_))
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_request_error() {
    // Nothing listens on port 9 (discard) in the test environment.
    let backend =
        HttpBackend::new(ClientConfig::default().with_base_url("http://127.0.0.1:9")).unwrap();
    let err = backend.progress().await.unwrap_err();
    assert!(matches!(err, Error::Request(_)));
}
