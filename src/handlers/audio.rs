use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::jobs::{JobRecord, JobState};
use crate::utils::validation::validate_audio_upload;

#[derive(Serialize, ToSchema)]
pub struct ProcessAudioResponse {
    pub message: String,
    pub transcriptions: Vec<String>,
    pub transcript_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status_url: String,
}

/// Shape of the multipart body, for the OpenAPI docs only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AudioUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

struct AudioUpload {
    filename: String,
    data: Vec<u8>,
}

/// Pulls the `file` field out of the multipart body and validates it.
/// Nothing is staged or uploaded before this returns Ok.
async fn read_audio_upload(multipart: &mut Multipart) -> Result<AudioUpload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let raw_name = field.file_name().unwrap_or_default().to_string();
        if raw_name.is_empty() {
            return Err(AppError::Validation(
                "No file selected for upload".to_string(),
            ));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::Validation(
                "No file selected for upload".to_string(),
            ));
        }

        let filename = validate_audio_upload(&raw_name, &data)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        return Ok(AudioUpload {
            filename,
            data: data.to_vec(),
        });
    }

    Err(AppError::Validation("No file part in the request".to_string()))
}

#[utoipa::path(
    post,
    path = "/process-audio",
    request_body(content = AudioUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Audio transcribed and transcript persisted", body = ProcessAudioResponse),
        (status = 400, description = "Missing or invalid file field"),
        (status = 500, description = "Storage, transcription or persistence failure")
    ),
    tag = "audio"
)]
pub async fn process_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessAudioResponse>, AppError> {
    let upload = read_audio_upload(&mut multipart).await?;

    let request_id = Uuid::new_v4();
    let result = state
        .pipeline
        .run(request_id, &upload.filename, &upload.data)
        .await?;

    Ok(Json(ProcessAudioResponse {
        message: "Transcription completed and saved to Google Cloud Storage".to_string(),
        transcriptions: result.transcriptions,
        transcript_key: result.transcript_key,
    }))
}

#[utoipa::path(
    post,
    path = "/jobs",
    request_body(content = AudioUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Job accepted; poll the status URL", body = JobAccepted),
        (status = 400, description = "Missing or invalid file field")
    ),
    tag = "jobs"
)]
pub async fn submit_transcription_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JobAccepted>), AppError> {
    let upload = read_audio_upload(&mut multipart).await?;

    let job_id = state.jobs.create(&upload.filename);
    let pipeline = state.pipeline.clone();
    let jobs = state.jobs.clone();

    tokio::spawn(async move {
        jobs.update(job_id, JobState::Processing);
        match pipeline.run(job_id, &upload.filename, &upload.data).await {
            Ok(result) => {
                jobs.update(
                    job_id,
                    JobState::Completed {
                        transcriptions: result.transcriptions,
                        transcript_key: result.transcript_key,
                    },
                );
            }
            Err(e) => {
                tracing::error!("Transcription job {} failed: {}", job_id, e);
                jobs.update(
                    job_id,
                    JobState::Failed {
                        message: e.user_message(),
                    },
                );
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id,
            status_url: format!("/jobs/{job_id}"),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Transcription job id")
    ),
    responses(
        (status = 200, description = "Current job record", body = JobRecord),
        (status = 404, description = "Unknown job id")
    ),
    tag = "jobs"
)]
pub async fn transcription_job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobRecord>, AppError> {
    state
        .jobs
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No transcription job with id {id}")))
}
