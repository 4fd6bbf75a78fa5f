//! Dudewhere: root CID to CAR object keys
//!
//! The dudewhere bucket stores one empty object per (root, CAR) pair, keyed
//! `{root v1 base32}/{car cid}`. Listing by prefix yields every CAR known to
//! contain the root. Data written before roots were normalized to v1 sits
//! under the raw v0 string instead, so legacy inputs get one extra listing.

use super::error::{Backend, BackendResult};
use super::Lookup;
use crate::core::identifier::Identifier;
use async_trait::async_trait;
use tracing::debug;

/// Default dudewhere bucket
pub const DEFAULT_BUCKET: &str = "dudewhere-prod-0";

/// Prefix listing against an object store
#[async_trait]
pub trait ObjectLister: Send + Sync {
    /// Every key in `bucket` starting with `prefix`
    async fn list_keys(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<String>>;
}

/// Archive-mapping lookup over an [`ObjectLister`]
#[derive(Debug, Clone)]
pub struct DudewhereLookup<L> {
    lister: L,
    bucket: String,
}

impl<L: ObjectLister> DudewhereLookup<L> {
    pub fn new(lister: L, bucket: impl Into<String>) -> Self {
        Self {
            lister,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// List the CAR object keys mapped to a root CID.
    ///
    /// Falls back to the literal v0 prefix exactly once when the v1 listing
    /// is empty and the input was v0. An error at either step ends the chain.
    pub async fn list_mappings(&self, id: &Identifier) -> BackendResult<Vec<String>> {
        let prefix = primary_prefix(id);
        let keys = self.lister.list_keys(&self.bucket, &prefix).await?;
        if !keys.is_empty() {
            return Ok(keys);
        }

        match id.legacy_string() {
            Some(legacy) => {
                debug!(cid = %id, prefix = %legacy, "no v1 mapping, trying legacy prefix");
                self.lister.list_keys(&self.bucket, &legacy).await
            }
            None => Ok(keys),
        }
    }
}

#[async_trait]
impl<L: ObjectLister> Lookup for DudewhereLookup<L> {
    type Output = Vec<String>;

    fn backend(&self) -> Backend {
        Backend::Dudewhere
    }

    async fn lookup(&self, id: &Identifier) -> BackendResult<Option<Vec<String>>> {
        let keys = self.list_mappings(id).await?;
        Ok((!keys.is_empty()).then_some(keys))
    }
}

/// `{v1 base32}/`
pub fn primary_prefix(id: &Identifier) -> String {
    format!("{}/", id.v1_string())
}
