use crate::config::AppConfig;
use crate::services::speech::GoogleSpeechClient;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub fn setup_speech(config: &AppConfig) -> Result<Arc<GoogleSpeechClient>> {
    info!(
        "🗣️  Speech API: {} (encoding={}, {} Hz, {})",
        config.speech_endpoint,
        config.audio_encoding,
        config.sample_rate_hertz,
        config.language_code
    );

    Ok(Arc::new(GoogleSpeechClient::from_config(config)?))
}
