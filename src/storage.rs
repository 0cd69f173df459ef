use async_trait::async_trait;
use log::{error, info, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Remote host for report attachments. `upload` returns the public URL the
/// stored record carries.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, hash: &str, bytes: &[u8]) -> Result<String, MediaStoreError>;
    async fn delete(&self, url: &str) -> Result<(), MediaStoreError>;
}

// ---------------- S3 implementation (MinIO compatible) ----------------
pub struct S3MediaStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    prefix: String,
    public_base: String,
}

impl S3MediaStore {
    pub async fn new() -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "glitchdesk-media".into());
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("S3_ENDPOINT must be set (MinIO / S3 endpoint)"))?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region));
        loader = loader.endpoint_url(endpoint.clone());
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Path-style addressing is required for most MinIO/local endpoints
        // without wildcard DNS.
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("Initialized S3/MinIO media client (path-style addressing enabled)");

        ensure_bucket(&client, &bucket).await?;

        let public_base = format!("{}/{}", endpoint.trim_end_matches('/'), bucket);
        Ok(Self {
            bucket,
            client,
            // fixed attachment folder
            prefix: "glitch-reports".into(),
            public_base,
        })
    }

    fn key_for(&self, hash: &str) -> String {
        format!("{}/{}/{}", self.prefix, &hash[0..2], hash)
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

async fn ensure_bucket(client: &aws_sdk_s3::Client, bucket: &str) -> anyhow::Result<()> {
    if client.head_bucket().bucket(bucket).send().await.is_ok() {
        return Ok(());
    }
    warn!("bucket '{bucket}' missing, attempting create");
    let max_attempts = 8u32;
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("created bucket '{bucket}' (attempt {attempt})");
                return Ok(());
            }
            Err(e) if attempt >= max_attempts => {
                error!("create_bucket failed for '{bucket}' after {attempt} attempts: {e:?}");
                return Err(anyhow::anyhow!("failed to ensure bucket '{bucket}': {e}"));
            }
            Err(e) => {
                let backoff_ms = 200 * attempt.pow(2); // quadratic backoff
                warn!("create_bucket attempt {attempt} failed for '{bucket}': {e:?} (retrying in {backoff_ms}ms)");
                tokio::time::sleep(std::time::Duration::from_millis(backoff_ms as u64)).await;
            }
        }
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(&self, hash: &str, bytes: &[u8]) -> Result<String, MediaStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let key = self.key_for(hash);
        // Keys are content hashes: identical bytes land on the same object,
        // so an existing object already is this upload.
        if self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .is_ok()
        {
            return Ok(self.url_for(&key));
        }
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(
                infer::get(bytes)
                    .map(|t| t.mime_type().to_string())
                    .unwrap_or_else(|| "application/octet-stream".into()),
            );
        if let Err(e) = put.send().await {
            error!(
                "put_object failed hash={hash} key={key} bucket={} err={:?}",
                self.bucket, e
            );
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(MediaStoreError::Other(format!("{e}{hint}")));
        }
        Ok(self.url_for(&key))
    }

    async fn delete(&self, url: &str) -> Result<(), MediaStoreError> {
        let Some(key) = url.strip_prefix(&format!("{}/", self.public_base)) else {
            return Err(MediaStoreError::NotFound);
        };
        // Best-effort delete: treat not found as success
        let _ = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        Ok(())
    }
}

// Factory used in main; misconfiguration is fatal at startup.
pub async fn build_media_store() -> Arc<dyn MediaStore> {
    match S3MediaStore::new().await {
        Ok(store) => Arc::new(store),
        Err(e) => panic!("Failed to initialize S3 media store: {e}"),
    }
}
