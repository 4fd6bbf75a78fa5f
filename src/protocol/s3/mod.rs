//! S3 listing client for the dudewhere bucket
//!
//! The dudewhere mapping lives in a Cloudflare R2 bucket, reached through the
//! official AWS SDK pointed at the R2 account endpoint. Only prefix listing is
//! needed; the client never writes.
//!
//! # Example
//!
//! ```no_run
//! use w3stat::backend::ObjectLister;
//! use w3stat::protocol::s3::{S3Client, S3Config, DEFAULT_R2_ENDPOINT, DEFAULT_R2_REGION};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = S3Config::r2(DEFAULT_R2_ENDPOINT, DEFAULT_R2_REGION)
//!         .with_credentials("key-id".to_string(), "secret".to_string());
//!     let client = S3Client::new(config).await?;
//!     let keys = client.list_keys("dudewhere-prod-0", "bafy.../").await?;
//!     println!("{keys:?}");
//!     Ok(())
//! }
//! ```

mod client;
mod config;
pub(crate) mod error;

pub use client::S3Client;
pub use config::{S3Config, DEFAULT_R2_ENDPOINT, DEFAULT_R2_REGION};
