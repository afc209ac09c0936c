pub mod config;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::jobs::JobStore;
use crate::services::pipeline::TranscriptionPipeline;
use crate::services::storage::ObjectStore;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::audio::process_audio,
        handlers::audio::submit_transcription_job,
        handlers::audio::transcription_job_status,
        handlers::health::health_check,
    ),
    components(
        schemas(
            handlers::audio::ProcessAudioResponse,
            handlers::audio::JobAccepted,
            handlers::audio::AudioUploadForm,
            handlers::health::HealthResponse,
            services::jobs::JobRecord,
            services::jobs::JobState,
        )
    ),
    tags(
        (name = "audio", description = "Synchronous upload-and-transcribe endpoint"),
        (name = "jobs", description = "Asynchronous transcription jobs"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranscriptionPipeline>,
    pub jobs: Arc<JobStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(handlers::pages::index))
        .route("/health", get(handlers::health::health_check))
        .route("/process-audio", post(handlers::audio::process_audio))
        .route("/jobs", post(handlers::audio::submit_transcription_job))
        .route("/jobs/:id", get(handlers::audio::transcription_job_status))
        .with_state(state)
}
