/*!
 * Configuration types for w3stat
 *
 * Values are layered: built-in defaults, then an optional TOML file, then
 * command-line flags. Secrets are never read from the file; R2 credentials
 * come from the environment only.
 */

use crate::backend::denylist::DEFAULT_DENYLIST_URL;
use crate::backend::dudewhere::DEFAULT_BUCKET;
use crate::backend::index::DEFAULT_TABLE;
use crate::core::{DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY};
use crate::error::{Result, StatError};
use crate::protocol::s3::{DEFAULT_R2_ENDPOINT, DEFAULT_R2_REGION};
use crate::protocol::S3Config;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the R2 access key id
pub const R2_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";

/// Environment variable holding the R2 secret access key
pub const R2_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";

/// Lookup configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Identifiers in flight at once
    pub concurrency: usize,

    /// Per backend call timeout in seconds
    pub call_timeout_secs: u64,

    /// Denylist service base URL
    pub denylist_url: String,

    /// Bucket holding the dudewhere mappings
    pub bucket: String,

    /// S3-compatible endpoint for the dudewhere bucket
    pub r2_endpoint: String,

    /// Region sent to the S3-compatible endpoint
    pub r2_region: String,

    /// Path-style bucket addressing, for endpoints without virtual hosts
    pub r2_force_path_style: bool,

    /// DynamoDB block index table
    pub table: String,

    /// DynamoDB region; the AWS provider chain decides when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamo_region: Option<String>,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
            denylist_url: DEFAULT_DENYLIST_URL.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            r2_endpoint: DEFAULT_R2_ENDPOINT.to_string(),
            r2_region: DEFAULT_R2_REGION.to_string(),
            r2_force_path_style: false,
            table: DEFAULT_TABLE.to_string(),
            dynamo_region: None,
            log_level: LogLevel::default(),
        }
    }
}

impl LookupConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StatError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: LookupConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults, or the file at `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check values that would otherwise fail late, per item
    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_secs == 0 {
            return Err(StatError::Config(
                "call_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.bucket.trim().is_empty() {
            return Err(StatError::Config("bucket must not be empty".to_string()));
        }

        if self.table.trim().is_empty() {
            return Err(StatError::Config("table must not be empty".to_string()));
        }

        for (name, value) in [("denylist_url", &self.denylist_url), ("r2_endpoint", &self.r2_endpoint)] {
            let url = Url::parse(value)
                .map_err(|e| StatError::Config(format!("{} {:?} is not a URL: {}", name, value, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(StatError::Config(format!(
                    "{} must be an http(s) URL: {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Per backend call timeout
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// S3 client settings for the dudewhere bucket
    pub fn s3_config(&self, credentials: R2Credentials) -> S3Config {
        let mut config = S3Config::r2(&self.r2_endpoint, &self.r2_region)
            .with_credentials(credentials.access_key_id, credentials.secret_access_key);
        config.timeout_seconds = self.call_timeout_secs;
        config.force_path_style = self.r2_force_path_style;
        config
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// R2 access keys for the dudewhere bucket
#[derive(Clone, PartialEq, Eq)]
pub struct R2Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for R2Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl R2Credentials {
    /// Read both keys from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read both keys through `lookup`. Unset and empty are both missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| StatError::MissingEnv(key.to_string()))
        };

        Ok(Self {
            access_key_id: require(R2_ACCESS_KEY_ID)?,
            secret_access_key: require(R2_SECRET_ACCESS_KEY)?,
        })
    }
}
