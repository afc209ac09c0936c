use anyhow::Result;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

/// Seam between the pipeline and the object-storage backend. The production
/// implementation speaks the S3 API; tests substitute an in-memory store.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `data` to the bucket under `key`, overwriting any existing
    /// object with the same key.
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// URI of the object under `key` as the speech service addresses it,
    /// e.g. gs://<bucket>/<key>.
    fn object_uri(&self, key: &str) -> String;
}

/// S3-compatible object store (MinIO, AWS, or the GCS interoperability API).
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    uri_scheme: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String, uri_scheme: String) -> Self {
        Self {
            client,
            bucket,
            uri_scheme,
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    fn object_uri(&self, key: &str) -> String {
        format!("{}://{}/{}", self.uri_scheme, self.bucket, key)
    }
}
