//! S3 client implementation

use super::config::S3Config;
use super::error::from_sdk;
use crate::backend::{Backend, BackendResult, ObjectLister};
use crate::error::Result;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client as AwsS3Client;
use std::time::Duration;
use tracing::trace;

/// S3 client for listing keys on AWS S3 and S3-compatible storage (R2)
#[derive(Clone)]
pub struct S3Client {
    /// AWS S3 client
    client: AwsS3Client,

    /// Client configuration
    config: S3Config,
}

impl S3Client {
    /// Create a new S3 client with the given configuration
    pub async fn new(config: S3Config) -> Result<Self> {
        // Validate configuration
        config.validate()?;

        // Build AWS SDK client
        let client = Self::build_aws_client(&config).await;

        Ok(Self { client, config })
    }

    /// Build the AWS SDK S3 client from configuration
    async fn build_aws_client(config: &S3Config) -> AwsS3Client {
        // Start with default AWS config loader
        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        // Set region
        let region_provider = if let Some(region_str) = &config.region {
            RegionProviderChain::first_try(Region::new(region_str.clone()))
        } else {
            RegionProviderChain::default_provider()
        };
        aws_config_loader = aws_config_loader.region(region_provider);

        // Set explicit credentials if provided
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials = Credentials::new(access_key, secret_key, None, None, "w3stat-r2");
            aws_config_loader = aws_config_loader.credentials_provider(credentials);
        }

        // Load AWS config
        let aws_config = aws_config_loader.load().await;

        // Build S3-specific config
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        // Set custom endpoint if provided
        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        // Force path-style addressing if configured (required for MinIO, LocalStack)
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        // Set timeout
        let timeout_config = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(config.timeout_seconds))
            .build();
        s3_config_builder = s3_config_builder.timeout_config(timeout_config);

        AwsS3Client::from_conf(s3_config_builder.build())
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }
}

#[async_trait]
impl ObjectLister for S3Client {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| from_sdk(Backend::Dudewhere, e, self.timeout()))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    trace!(bucket, prefix, keys_so_far = keys.len(), "listing next page");
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }
}
