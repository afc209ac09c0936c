mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{FailingRecognizer, MemoryObjectStore, StaticRecognizer, multipart_request, test_app};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SAMPLE_MP3: &[u8] = b"ID3\x04\x00fake mp3 payload for tests";

async fn response_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Polls the job endpoint until the record reaches a terminal state.
async fn await_terminal_state(app: &axum::Router, job_id: &str) -> Value {
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/jobs/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        let state = json["status"]["state"].as_str().unwrap().to_string();
        if state == "completed" || state == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} never reached a terminal state");
}

#[tokio::test]
async fn job_flow_accepts_processes_and_completes() {
    let storage = MemoryObjectStore::new();
    let speech = StaticRecognizer::new(&["привет", "как дела"]);
    let upload_dir = tempfile::tempdir().unwrap();
    let app = test_app(storage.clone(), speech, upload_dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/jobs",
            "file",
            Some("sample.mp3"),
            SAMPLE_MP3,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = response_json(response).await;
    let job_id = json["job_id"].as_str().unwrap().to_string();
    assert_eq!(json["status_url"], format!("/jobs/{job_id}"));

    let record = await_terminal_state(&app, &job_id).await;
    assert_eq!(record["status"]["state"], "completed");
    assert_eq!(record["filename"], "sample.mp3");
    assert_eq!(
        record["status"]["transcriptions"],
        serde_json::json!(["привет", "как дела"])
    );

    // Per-job transcript key, derived from the job id
    let transcript_key = format!("transcripts/{job_id}.txt");
    assert_eq!(record["status"]["transcript_key"], transcript_key);
    assert_eq!(
        storage.get(&transcript_key).unwrap(),
        "привет\nкак дела".as_bytes()
    );

    // Staging directory cleaned up after the background run
    assert_eq!(std::fs::read_dir(upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn job_submission_validates_before_accepting() {
    let storage = MemoryObjectStore::new();
    let speech = StaticRecognizer::new(&["привет"]);
    let upload_dir = tempfile::tempdir().unwrap();
    let app = test_app(storage.clone(), speech, upload_dir.path());

    let response = app
        .oneshot(multipart_request(
            "/jobs",
            "metadata",
            Some("sample.mp3"),
            SAMPLE_MP3,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["message"], "No file part in the request");
    assert!(storage.is_empty());
}

#[tokio::test]
async fn failed_job_reports_generic_message() {
    let storage = MemoryObjectStore::new();
    let upload_dir = tempfile::tempdir().unwrap();
    let app = test_app(storage, Arc::new(FailingRecognizer), upload_dir.path());

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/jobs",
            "file",
            Some("sample.mp3"),
            SAMPLE_MP3,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = response_json(response).await;
    let job_id = json["job_id"].as_str().unwrap().to_string();

    let record = await_terminal_state(&app, &job_id).await;
    assert_eq!(record["status"]["state"], "failed");
    assert_eq!(record["status"]["message"], "Error during transcription");
}

#[tokio::test]
async fn unknown_job_id_returns_404() {
    let storage = MemoryObjectStore::new();
    let speech = StaticRecognizer::new(&[]);
    let upload_dir = tempfile::tempdir().unwrap();
    let app = test_app(storage, speech, upload_dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = response_json(response).await;
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .starts_with("No transcription job")
    );
}
