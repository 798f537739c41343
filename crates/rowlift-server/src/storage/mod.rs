//! Object storage for uploaded files and failure report artifacts

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use rowlift_common::checksum::sha256_hex;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub mod config;

/// Errors raised by object storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload failed for '{key}': {message}")]
    Upload { key: String, message: String },

    #[error("Download failed for '{key}': {message}")]
    Download { key: String, message: String },

    #[error("Failed to presign URL for '{key}': {message}")]
    Presign { key: String, message: String },

    #[error("Delete failed for '{key}': {message}")]
    Delete { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

/// File storage contract consumed by the import engine.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<UploadResult, StorageError>;

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Download an object into the local cache directory and return its
    /// path, so the tabular reader can open it.
    async fn fetch_to_local(&self, key: &str, file_name: &str) -> Result<PathBuf, StorageError>;

    /// Time-limited download URL for user-facing links.
    async fn download_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// S3-compatible storage client (AWS S3 or MinIO).
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    local_cache_dir: PathBuf,
}

impl S3Storage {
    pub fn new(config: config::StorageConfig) -> Self {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "rowlift-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Storage client initialized for bucket: {}", config.bucket);

        Self {
            client,
            bucket: config.bucket,
            local_cache_dir: config.local_cache_dir,
        }
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    #[instrument(skip(self, data))]
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<UploadResult, StorageError> {
        let checksum = sha256_hex(&data);
        let size = data.len() as i64;

        debug!("Uploading {} bytes to s3://{}/{}", size, self.bucket, key);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.map_err(|e| StorageError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        info!("Successfully uploaded to s3://{}/{}", self.bucket, key);

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    #[instrument(skip(self))]
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        debug!("Downloading from s3://{}/{}", self.bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Download {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Download {
                key: key.to_string(),
                message: e.to_string(),
            })?
            .into_bytes()
            .to_vec();

        debug!(
            "Downloaded {} bytes from s3://{}/{}",
            data.len(),
            self.bucket,
            key
        );

        Ok(data)
    }

    #[instrument(skip(self))]
    async fn fetch_to_local(&self, key: &str, file_name: &str) -> Result<PathBuf, StorageError> {
        let data = self.download(key).await?;

        tokio::fs::create_dir_all(&self.local_cache_dir).await?;

        let local_path = self
            .local_cache_dir
            .join(format!("{}-{}", Uuid::new_v4(), file_name));
        tokio::fs::write(&local_path, data).await?;

        debug!(
            "Fetched s3://{}/{} to {}",
            self.bucket,
            key,
            local_path.display()
        );

        Ok(local_path)
    }

    #[instrument(skip(self))]
    async fn download_url(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let presigning_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| StorageError::Presign {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::Presign {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(presigned_request.uri().to_string())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        info!("Successfully deleted s3://{}/{}", self.bucket, key);

        Ok(())
    }
}

/// Storage key for a record's uploaded source file.
pub fn source_file_key(import_record_id: i64, file_name: &str) -> String {
    format!(
        "import-records/{}/upload_file/{}-{}",
        import_record_id,
        Uuid::new_v4(),
        file_name
    )
}

/// Storage key for a record's failure report artifact.
pub fn failed_report_key(import_record_id: i64, file_name: &str) -> String {
    format!(
        "import-records/{}/failed_rows_file/{}",
        import_record_id, file_name
    )
}

/// MIME type for an uploaded tabular file, by extension.
pub fn content_type_for(file_name: &str) -> Option<String> {
    let ext = file_name.rsplit('.').next()?.to_lowercase();
    let mime = match ext.as_str() {
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xls" => "application/vnd.ms-excel",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "csv" => "text/csv",
        _ => return None,
    };
    Some(mime.to_string())
}
