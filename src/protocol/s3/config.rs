//! Configuration types for the S3 listing client

use crate::error::{Result, StatError};
use serde::{Deserialize, Serialize};

/// Cloudflare R2 account endpoint the dudewhere bucket lives on
pub const DEFAULT_R2_ENDPOINT: &str =
    "https://fffa4b4363a7e5250af8357087263b3a.r2.cloudflarestorage.com";

/// R2 accepts any region; `auto` is the documented value
pub const DEFAULT_R2_REGION: &str = "auto";

/// S3 client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Custom endpoint URL (R2, MinIO, LocalStack)
    pub endpoint: Option<String>,

    /// Region (e.g., "auto" for R2, "us-east-1" for AWS)
    pub region: Option<String>,

    /// Access key ID (optional - uses credential chain if not provided)
    #[serde(skip_serializing)]
    pub access_key: Option<String>,

    /// Secret access key (optional - uses credential chain if not provided)
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,

    /// Path-style addressing (required for some S3-compatible services)
    pub force_path_style: bool,

    /// Operation timeout in seconds
    pub timeout_seconds: u64,
}

impl S3Config {
    /// Config for the dudewhere R2 account
    pub fn r2(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: Some(region.into()),
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(StatError::Config(format!(
                    "S3 endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(StatError::Config(
                "S3 timeout must be at least 1 second".to_string(),
            ));
        }

        // Validate credentials consistency
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(StatError::Config(
                "Both access_key and secret_key must be provided together".to_string(),
            ));
        }

        Ok(())
    }

    /// Set credentials explicitly
    pub fn with_credentials(mut self, access_key: String, secret_key: String) -> Self {
        self.access_key = Some(access_key);
        self.secret_key = Some(secret_key);
        self
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
            timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_r2_config() {
        let config = S3Config::r2(DEFAULT_R2_ENDPOINT, DEFAULT_R2_REGION)
            .with_credentials("id".into(), "secret".into());
        assert!(config.validate().is_ok());
        assert_eq!(config.access_key.as_deref(), Some("id"));
        assert!(!config.force_path_style);
        assert_eq!(config.region.as_deref(), Some("auto"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = S3Config::r2("ftp://example.com", DEFAULT_R2_REGION);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let config = S3Config {
            timeout_seconds: 0,
            ..S3Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mismatched_credentials() {
        let config = S3Config {
            access_key: Some("id".into()),
            ..S3Config::default()
        };
        assert!(matches!(config.validate(), Err(StatError::Config(_))));
    }

    #[test]
    fn test_credentials_not_serialized() {
        let config = S3Config::default().with_credentials("id".into(), "hunter2".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
