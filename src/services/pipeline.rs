use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::speech::SpeechRecognizer;
use crate::services::storage::ObjectStore;

/// Outcome of a fully successful pipeline run.
pub struct PipelineResult {
    pub transcriptions: Vec<String>,
    pub audio_key: String,
    pub transcript_key: String,
}

/// The upload → store → transcribe → persist sequence, shared by the
/// synchronous endpoint and the background job runner.
///
/// Each request gets its own staging directory and storage keys derived from
/// `request_id`, so concurrent requests never collide. There is no retry and
/// no rollback: a failure short-circuits the remaining steps, and local
/// staging files are only removed on the full success path.
pub struct TranscriptionPipeline {
    storage: Arc<dyn ObjectStore>,
    speech: Arc<dyn SpeechRecognizer>,
    upload_dir: PathBuf,
}

impl TranscriptionPipeline {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        speech: Arc<dyn SpeechRecognizer>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            speech,
            upload_dir,
        }
    }

    pub async fn run(
        &self,
        request_id: Uuid,
        filename: &str,
        data: &[u8],
    ) -> Result<PipelineResult, AppError> {
        // 1. Stage the upload locally
        let staging_dir = self.upload_dir.join(request_id.to_string());
        fs::create_dir_all(&staging_dir).await?;
        let audio_path = staging_dir.join(filename);
        fs::write(&audio_path, data).await?;
        info!(
            "💾 Staged {} ({} bytes) at {}",
            filename,
            data.len(),
            audio_path.display()
        );

        // 2. Upload the staged file to the bucket
        let audio_key = format!("audio/{}/{}", request_id, filename);
        let staged_bytes = fs::read(&audio_path).await?;
        self.storage
            .put_object(&audio_key, staged_bytes)
            .await
            .map_err(AppError::Storage)?;
        info!("☁️  Uploaded audio as {}", audio_key);

        // 3. Long-running recognition against the stored object
        let audio_uri = self.storage.object_uri(&audio_key);
        let transcriptions = self
            .speech
            .recognize(&audio_uri)
            .await
            .map_err(AppError::Transcription)?;
        info!(
            "🗣️  Recognition finished for {}: {} segment(s)",
            audio_uri,
            transcriptions.len()
        );

        // 4. Persist the joined transcript and clean up the staging directory
        let transcript_key = format!("transcripts/{}.txt", request_id);
        let transcript_path = staging_dir.join("transcript.txt");
        self.persist_transcript(&staging_dir, &transcript_path, &transcript_key, &transcriptions)
            .await
            .map_err(AppError::Persistence)?;
        info!("✅ Transcript saved as {}", transcript_key);

        Ok(PipelineResult {
            transcriptions,
            audio_key,
            transcript_key,
        })
    }

    /// Joins the segments with newlines, writes the blob next to the staged
    /// audio, uploads it, then removes the whole staging directory. Any
    /// failure leaves the local files behind.
    async fn persist_transcript(
        &self,
        staging_dir: &Path,
        transcript_path: &Path,
        transcript_key: &str,
        transcriptions: &[String],
    ) -> anyhow::Result<()> {
        let text = transcriptions.join("\n");
        fs::write(transcript_path, &text).await?;
        self.storage
            .put_object(transcript_key, text.into_bytes())
            .await?;
        fs::remove_dir_all(staging_dir).await?;
        Ok(())
    }
}
