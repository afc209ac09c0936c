use dotenvy::dotenv;
use rust_transcribe_backend::config::AppConfig;
use rust_transcribe_backend::infrastructure::{speech, storage};
use rust_transcribe_backend::services::jobs::{JobStore, JobSweeper};
use rust_transcribe_backend::services::pipeline::TranscriptionPipeline;
use rust_transcribe_backend::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env();

    // Initialize tracing with EnvFilter; DEBUG_MODE only shifts the default
    let default_filter = if config.debug {
        "rust_transcribe_backend=debug,tower_http=debug"
    } else {
        "rust_transcribe_backend=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Rust Transcribe Backend...");
    info!(
        "🎙️  Pipeline config: bucket={}, language={}, {} Hz {}, wait ceiling {}s",
        config.bucket,
        config.language_code,
        config.sample_rate_hertz,
        config.audio_encoding,
        config.operation_timeout_secs
    );

    // Setup Infrastructure
    let storage_service = storage::setup_storage(&config).await;
    let speech_client = speech::setup_speech(&config)?;

    let pipeline = Arc::new(TranscriptionPipeline::new(
        storage_service.clone(),
        speech_client,
        config.upload_dir.clone(),
    ));
    let jobs = Arc::new(JobStore::new());

    let state = AppState {
        pipeline,
        jobs: jobs.clone(),
        storage: storage_service,
        config: config.clone(),
    };

    // Setup Shutdown Channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Start Job Sweeper
    let sweeper = JobSweeper::new(jobs, config.job_ttl_secs, shutdown_rx);
    tokio::spawn(async move {
        sweeper.run().await;
    });

    let app = create_app(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    info!("📥 {} {}", request.method(), request.uri());
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        info!(
                            "📤 Finished in {:?} with status {}",
                            latency,
                            response.status()
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(config.max_upload_size));

    let addr: SocketAddr = config.bind_addr.parse()?;
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
