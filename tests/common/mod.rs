#![allow(dead_code)]

use anyhow::{Result, bail};
use axum::{Router, body::Body, http::Request};
use rust_transcribe_backend::config::AppConfig;
use rust_transcribe_backend::services::jobs::JobStore;
use rust_transcribe_backend::services::pipeline::TranscriptionPipeline;
use rust_transcribe_backend::services::speech::SpeechRecognizer;
use rust_transcribe_backend::services::storage::ObjectStore;
use rust_transcribe_backend::{AppState, create_app};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

/// In-memory stand-in for the S3 bucket.
pub struct MemoryObjectStore {
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            bucket: "test-bucket".to_string(),
            objects: Mutex::new(HashMap::new()),
            fail_puts: AtomicBool::new(false),
        })
    }

    /// A store whose every put fails, to exercise the storage error path.
    pub fn failing() -> Arc<Self> {
        let store = Self::new();
        store.fail_puts.store(true, Ordering::SeqCst);
        store
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            bail!("injected storage failure");
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn object_uri(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }
}

/// Recognizer that returns a fixed segment list and records the URIs it saw.
pub struct StaticRecognizer {
    pub transcriptions: Vec<String>,
    pub seen_uris: Mutex<Vec<String>>,
}

impl StaticRecognizer {
    pub fn new(transcriptions: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            transcriptions: transcriptions.iter().map(|s| s.to_string()).collect(),
            seen_uris: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for StaticRecognizer {
    async fn recognize(&self, audio_uri: &str) -> Result<Vec<String>> {
        self.seen_uris.lock().unwrap().push(audio_uri.to_string());
        Ok(self.transcriptions.clone())
    }
}

/// Recognizer whose every call fails, to exercise the transcription error path.
pub struct FailingRecognizer;

#[async_trait::async_trait]
impl SpeechRecognizer for FailingRecognizer {
    async fn recognize(&self, _audio_uri: &str) -> Result<Vec<String>> {
        bail!("speech backend unavailable");
    }
}

pub fn test_app(
    storage: Arc<MemoryObjectStore>,
    speech: Arc<dyn SpeechRecognizer>,
    upload_dir: &Path,
) -> Router {
    let config = AppConfig {
        upload_dir: upload_dir.to_path_buf(),
        ..AppConfig::development()
    };

    let pipeline = Arc::new(TranscriptionPipeline::new(
        storage.clone(),
        speech,
        config.upload_dir.clone(),
    ));

    let state = AppState {
        pipeline,
        jobs: Arc::new(JobStore::new()),
        storage,
        config,
    };

    create_app(state)
}

/// Builds a multipart POST. `filename: None` sends a plain (non-file) field.
pub fn multipart_request(
    uri: &str,
    field_name: &str,
    filename: Option<&str>,
    content: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{name}\"\r\n\
                 Content-Type: audio/mpeg\r\n\r\n"
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field_name}\"\r\n\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
