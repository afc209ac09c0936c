use std::env;
use std::path::PathBuf;

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to (default: "127.0.0.1:3000")
    pub bind_addr: String,

    /// Bucket that receives both the audio and the transcript objects
    pub bucket: String,

    /// Optional S3-compatible endpoint (MinIO, GCS interoperability, ...)
    pub storage_endpoint: Option<String>,

    /// Region passed to the S3 client (default: "us-east-1")
    pub storage_region: String,

    /// Static credentials; when unset the ambient AWS chain is used
    pub storage_access_key: Option<String>,
    pub storage_secret_key: Option<String>,

    /// Scheme used when rendering object URIs for the speech service
    /// (default: "gs", producing gs://<bucket>/<key>)
    pub object_uri_scheme: String,

    /// Path to the Google service-account key JSON
    pub credentials_path: PathBuf,

    /// Base URL of the speech API (default: "https://speech.googleapis.com")
    pub speech_endpoint: String,

    /// Recognition language (default: "ru-RU")
    pub language_code: String,

    /// Recognition sample rate in Hz (default: 16000)
    pub sample_rate_hertz: u32,

    /// Recognition encoding as the API spells it (default: "MP3")
    pub audio_encoding: String,

    /// Ceiling on waiting for a recognition operation (default: 3600 s)
    pub operation_timeout_secs: u64,

    /// Interval between operation polls (default: 5 s)
    pub poll_interval_secs: u64,

    /// Local staging directory for uploads (default: "uploads")
    pub upload_dir: PathBuf,

    /// Maximum accepted upload size in bytes (default: 256 MB)
    pub max_upload_size: usize,

    /// Finished job records older than this are swept (default: 86400 s)
    pub job_ttl_secs: u64,

    /// Verbose logging by default; never hardcoded on
    pub debug: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            bucket: "recordings".to_string(),
            storage_endpoint: None,
            storage_region: "us-east-1".to_string(),
            storage_access_key: None,
            storage_secret_key: None,
            object_uri_scheme: "gs".to_string(),
            credentials_path: PathBuf::from("google-key.json"),
            speech_endpoint: "https://speech.googleapis.com".to_string(),
            language_code: "ru-RU".to_string(),
            sample_rate_hertz: 16000,
            audio_encoding: "MP3".to_string(),
            operation_timeout_secs: 3600,
            poll_interval_secs: 5,
            upload_dir: PathBuf::from("uploads"),
            max_upload_size: 256 * 1024 * 1024, // 256 MB
            job_ttl_secs: 86400,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(default.bind_addr),

            bucket: env::var("STORAGE_BUCKET").unwrap_or(default.bucket),

            storage_endpoint: env::var("STORAGE_ENDPOINT").ok(),

            storage_region: env::var("STORAGE_REGION").unwrap_or(default.storage_region),

            storage_access_key: env::var("STORAGE_ACCESS_KEY").ok(),

            storage_secret_key: env::var("STORAGE_SECRET_KEY").ok(),

            object_uri_scheme: env::var("OBJECT_URI_SCHEME").unwrap_or(default.object_uri_scheme),

            credentials_path: env::var("GOOGLE_APPLICATION_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or(default.credentials_path),

            speech_endpoint: env::var("SPEECH_ENDPOINT").unwrap_or(default.speech_endpoint),

            language_code: env::var("SPEECH_LANGUAGE_CODE").unwrap_or(default.language_code),

            sample_rate_hertz: env::var("SPEECH_SAMPLE_RATE_HERTZ")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.sample_rate_hertz),

            audio_encoding: env::var("SPEECH_AUDIO_ENCODING").unwrap_or(default.audio_encoding),

            operation_timeout_secs: env::var("SPEECH_OPERATION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.operation_timeout_secs),

            poll_interval_secs: env::var("SPEECH_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.poll_interval_secs),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            job_ttl_secs: env::var("JOB_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.job_ttl_secs),

            debug: env::var("DEBUG_MODE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.debug),
        }
    }

    /// Create config for development and tests (short polls, verbose logs)
    pub fn development() -> Self {
        Self {
            poll_interval_secs: 1,
            operation_timeout_secs: 30,
            debug: true,
            ..Self::default()
        }
    }
}
