use crate::config::AppConfig;
use crate::services::storage::S3ObjectStore;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(config: &AppConfig) -> Arc<S3ObjectStore> {
    info!(
        "☁️  Object storage: {} (Bucket: {})",
        config
            .storage_endpoint
            .as_deref()
            .unwrap_or("<default AWS endpoint>"),
        config.bucket
    );

    let mut loader = aws_config::from_env().region(Region::new(config.storage_region.clone()));

    if let Some(endpoint) = &config.storage_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) =
        (&config.storage_access_key, &config.storage_secret_key)
    {
        loader = loader.credentials_provider(Credentials::new(
            access_key, secret_key, None, None, "static",
        ));
    }

    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(true)
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3ObjectStore::new(
        s3_client,
        config.bucket.clone(),
        config.object_uri_scheme.clone(),
    ))
}
