//! Denylist existence check
//!
//! The denylist service answers `GET /{cid}` with 2xx when the CID is blocked
//! and 404 when it is not. It only knows v1 CIDs, so legacy inputs are
//! upgraded before the request is built.

use super::error::{Backend, BackendError, BackendResult};
use super::Lookup;
use crate::core::identifier::Identifier;
use crate::error::{Result, StatError};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Default denylist service
pub const DEFAULT_DENYLIST_URL: &str = "https://denylist.dag.haus";

/// A positive denylist answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenylistEntry {
    /// The URL that answered "present"
    pub url: String,
}

/// Denylist client, cheap to clone (shares the connection pool)
#[derive(Debug, Clone)]
pub struct DenylistLookup {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl DenylistLookup {
    /// Build a client for the service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("w3stat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StatError::Runtime(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client(client, base_url, timeout)
    }

    /// Use an existing HTTP client whose request timeout is `timeout`
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| StatError::Config(format!("Invalid denylist URL {}: {}", base_url, e)))?;
        // join() replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client,
            base,
            timeout,
        })
    }

    /// The URL queried for an identifier
    pub fn url_for(&self, id: &Identifier) -> BackendResult<Url> {
        self.base
            .join(&id.v1_string())
            .map_err(|e| BackendError::malformed(Backend::Denylist, e.to_string()))
    }

    /// Check whether the identifier is on the denylist
    pub async fn check(&self, id: &Identifier) -> BackendResult<Option<DenylistEntry>> {
        let url = self.url_for(id)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.http_error(e, &url))?;

        let status = response.status();
        debug!(cid = %id, %url, %status, "denylist response");

        let body = if is_definitive(status) {
            String::new()
        } else {
            match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<unreadable body: {}>", e),
            }
        };
        classify(status, body, &url)
    }

    fn http_error(&self, err: reqwest::Error, url: &Url) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                backend: Backend::Denylist,
                after: self.timeout,
            }
        } else {
            BackendError::transport(Backend::Denylist, format!("{}: {}", url, err))
        }
    }
}

#[async_trait]
impl Lookup for DenylistLookup {
    type Output = DenylistEntry;

    fn backend(&self) -> Backend {
        Backend::Denylist
    }

    async fn lookup(&self, id: &Identifier) -> BackendResult<Option<DenylistEntry>> {
        self.check(id).await
    }

    fn target(&self, id: &Identifier) -> Option<String> {
        self.url_for(id).ok().map(String::from)
    }
}

fn is_definitive(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::NOT_FOUND
}

/// Map a denylist HTTP status to present/absent/error
pub(crate) fn classify(
    status: StatusCode,
    body: String,
    url: &Url,
) -> BackendResult<Option<DenylistEntry>> {
    if status.is_success() {
        return Ok(Some(DenylistEntry {
            url: url.to_string(),
        }));
    }
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    Err(BackendError::UnexpectedResponse {
        backend: Backend::Denylist,
        status: status.as_u16().to_string(),
        body: format!("{} {}", body.trim(), url).trim().to_string(),
    })
}
