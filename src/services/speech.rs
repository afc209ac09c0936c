use anyhow::{Context, Result, anyhow, bail};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::config::AppConfig;

/// Seam between the pipeline and the speech-to-text backend. The production
/// implementation drives Google Cloud Speech; tests substitute a stub.
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Submits a long-running recognition job for the audio object at
    /// `audio_uri` and waits for completion. Returns the top alternative
    /// transcript of each recognized segment, in segment order.
    async fn recognize(&self, audio_uri: &str) -> Result<Vec<String>>;
}

/// Fixed recognition parameters for every submitted job.
#[derive(Debug, Clone)]
pub struct RecognitionSettings {
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub operation_timeout: Duration,
    pub poll_interval: Duration,
}

impl RecognitionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            encoding: config.audio_encoding.clone(),
            sample_rate_hertz: config.sample_rate_hertz,
            language_code: config.language_code.clone(),
            operation_timeout: Duration::from_secs(config.operation_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

/// Fields of the service-account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

#[derive(Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: u64,
}

/// Google Cloud Speech client using the v1p1beta1 REST surface:
/// `speech:longrunningrecognize` plus operation polling.
pub struct GoogleSpeechClient {
    http: reqwest::Client,
    endpoint: String,
    key: ServiceAccountKey,
    settings: RecognitionSettings,
    token: tokio::sync::Mutex<Option<CachedToken>>,
}

impl GoogleSpeechClient {
    pub fn new(endpoint: String, key: ServiceAccountKey, settings: RecognitionSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            key,
            settings,
            token: tokio::sync::Mutex::new(None),
        }
    }

    /// Builds a client from the service-account key file named in config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let key = load_service_account_key(&config.credentials_path)?;
        Ok(Self::new(
            config.speech_endpoint.clone(),
            key,
            RecognitionSettings::from_config(config),
        ))
    }

    /// OAuth access token via the JWT-bearer grant, cached until near expiry.
    async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            // 60s skew so a token never expires mid-request
            if cached.expires_at > now_secs() + 60 {
                return Ok(cached.value.clone());
            }
        }

        let now = now_secs();
        let claims = TokenClaims {
            iss: &self.key.client_email,
            scope: "https://www.googleapis.com/auth/cloud-platform",
            aud: &self.key.token_uri,
            exp: now + 3600,
            iat: now,
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("invalid service-account private key")?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .context("failed to sign token assertion")?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("token exchange request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("token exchange failed: status={status}, body={body}");
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("malformed token exchange response")?;

        let cached = CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        };
        *guard = Some(cached);

        Ok(token.access_token)
    }

    async fn fetch_operation(&self, token: &str, name: &str) -> Result<Operation> {
        let url = format!("{}/v1p1beta1/operations/{}", self.endpoint, name);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("operation poll request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("operation poll failed: status={status}, body={body}");
        }

        response
            .json::<Operation>()
            .await
            .context("malformed operation response")
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for GoogleSpeechClient {
    async fn recognize(&self, audio_uri: &str) -> Result<Vec<String>> {
        let token = self.access_token().await?;

        let body = serde_json::json!({
            "config": {
                "encoding": self.settings.encoding,
                "sampleRateHertz": self.settings.sample_rate_hertz,
                "languageCode": self.settings.language_code,
            },
            "audio": { "uri": audio_uri }
        });

        let url = format!("{}/v1p1beta1/speech:longrunningrecognize", self.endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .context("recognition submit request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("recognition submit failed: status={status}, body={text}");
        }

        let mut operation: Operation = response
            .json()
            .await
            .context("malformed longrunningrecognize response")?;

        info!("⏳ Waiting for recognition operation {}", operation.name);

        let deadline = Instant::now() + self.settings.operation_timeout;
        while !operation.done {
            if Instant::now() >= deadline {
                bail!(
                    "recognition operation {} did not complete within {}s",
                    operation.name,
                    self.settings.operation_timeout.as_secs()
                );
            }
            sleep(self.settings.poll_interval).await;
            operation = self.fetch_operation(&token, &operation.name).await?;
            debug!("Polled operation {}: done={}", operation.name, operation.done);
        }

        if let Some(err) = operation.error {
            bail!(
                "recognition operation {} failed: {} (code {})",
                operation.name,
                err.message,
                err.code
            );
        }

        let response = operation
            .response
            .ok_or_else(|| anyhow!("operation {} finished without a response", operation.name))?;

        Ok(top_transcripts(&response))
    }
}

/// Top (first, highest-confidence) alternative of each result, in order.
/// Results without alternatives are skipped.
pub fn top_transcripts(response: &LongRunningRecognizeResponse) -> Vec<String> {
    response
        .results
        .iter()
        .filter_map(|result| result.alternatives.first())
        .map(|alternative| alternative.transcript.clone())
        .collect()
}

pub fn load_service_account_key(path: &Path) -> Result<ServiceAccountKey> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read credentials file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("malformed credentials file {}", path.display()))
}

// --- Wire types (google.longrunning / speech v1p1beta1) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<LongRunningRecognizeResponse>,
}

#[derive(Debug, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongRunningRecognizeResponse {
    #[serde(default)]
    pub results: Vec<SpeechRecognitionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<SpeechRecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pending_operation() {
        let op: Operation =
            serde_json::from_str(r#"{"name": "operations/12345"}"#).unwrap();
        assert_eq!(op.name, "operations/12345");
        assert!(!op.done);
        assert!(op.error.is_none());
        assert!(op.response.is_none());
    }

    #[test]
    fn test_parse_failed_operation() {
        let raw = r#"{
            "name": "operations/12345",
            "done": true,
            "error": {"code": 3, "message": "Invalid audio encoding"}
        }"#;
        let op: Operation = serde_json::from_str(raw).unwrap();
        assert!(op.done);
        let err = op.error.unwrap();
        assert_eq!(err.code, 3);
        assert_eq!(err.message, "Invalid audio encoding");
    }

    #[test]
    fn test_parse_completed_operation_and_ordering() {
        let raw = r#"{
            "name": "operations/12345",
            "done": true,
            "response": {
                "@type": "type.googleapis.com/google.cloud.speech.v1p1beta1.LongRunningRecognizeResponse",
                "results": [
                    {"alternatives": [
                        {"transcript": "привет", "confidence": 0.92},
                        {"transcript": "привед", "confidence": 0.41}
                    ]},
                    {"alternatives": [
                        {"transcript": "как дела", "confidence": 0.88}
                    ]},
                    {"alternatives": []}
                ]
            }
        }"#;
        let op: Operation = serde_json::from_str(raw).unwrap();
        let response = op.response.unwrap();
        assert_eq!(top_transcripts(&response), vec!["привет", "как дела"]);
    }

    #[test]
    fn test_empty_response_yields_no_transcripts() {
        let response = LongRunningRecognizeResponse { results: vec![] };
        assert!(top_transcripts(&response).is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = RecognitionSettings::from_config(&AppConfig::default());
        assert_eq!(settings.encoding, "MP3");
        assert_eq!(settings.sample_rate_hertz, 16000);
        assert_eq!(settings.language_code, "ru-RU");
        assert_eq!(settings.operation_timeout, Duration::from_secs(3600));
    }
}
