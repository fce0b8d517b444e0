//! Photo storage using Cloudflare R2
//!
//! Handles upload, delete, and URL generation for report photos.
//! Files are served via R2 Custom Domain (CDN).

use aws_sdk_s3::Client as S3Client;

use crate::error::AppError;

/// Photo storage service
///
/// Uploads report photos to Cloudflare R2 and returns public URLs.
pub struct MediaStorage {
    /// S3-compatible client for R2
    client: S3Client,
    /// Media bucket name
    bucket: String,
    /// Public URL base (Custom Domain)
    /// e.g., "https://fotos.example.com"
    public_url: String,
}

impl MediaStorage {
    /// Create new photo storage client
    ///
    /// # Arguments
    /// * `config` - Storage configuration
    /// * `cloudflare` - Cloudflare credentials
    pub fn new(
        config: &crate::config::MediaStorageConfig,
        cloudflare: &crate::config::CloudflareConfig,
    ) -> Self {
        use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

        // R2 endpoint: https://{account_id}.r2.cloudflarestorage.com
        let endpoint = format!("https://{}.r2.cloudflarestorage.com", cloudflare.account_id);

        // Create credentials
        let credentials = Credentials::new(
            &cloudflare.r2_access_key_id,
            &cloudflare.r2_secret_access_key,
            None,
            None,
            "jackemate-r2",
        );

        // Build S3 config for R2
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("auto"))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .http_client(super::build_r2_http_client())
            .build();

        let client = S3Client::from_conf(s3_config);

        Self {
            client,
            bucket: config.bucket.clone(),
            public_url: config.public_url.clone(),
        }
    }

    /// Upload a file
    ///
    /// # Arguments
    /// * `key` - S3 key (path) for the file
    /// * `data` - File contents
    /// * `content_type` - MIME type
    ///
    /// # Returns
    /// Public URL for the uploaded file
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        use aws_sdk_s3::primitives::ByteStream;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .cache_control("public, max-age=31536000") // 1 year
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 upload failed: {}", e)))?;

        Ok(self.get_public_url(key))
    }

    /// Upload a report photo
    ///
    /// Stores in the reportes/ prefix, keyed by report and position.
    ///
    /// # Returns
    /// (S3 key, Public URL)
    pub async fn upload_report_photo(
        &self,
        report_id: &str,
        position: i64,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(String, String), AppError> {
        // Determine file extension from content type
        let ext = match content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        };

        let key = format!("reportes/{}/{}.{}", report_id, position, ext);
        let url = self.upload(&key, data, content_type).await?;
        Ok((key, url))
    }

    /// Delete a stored file
    ///
    /// # Arguments
    /// * `key` - S3 key to delete
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("R2 delete failed: {}", e)))?;

        Ok(())
    }

    /// Get public URL for an S3 key
    pub fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}
