//! Block index: multihash to CAR positions
//!
//! The index table is partitioned by the base58btc multihash of the block, so
//! v0 and v1 spellings of the same CID hit the same rows and no fallback is
//! needed.

use super::error::{Backend, BackendResult};
use super::Lookup;
use crate::core::identifier::Identifier;
use async_trait::async_trait;

/// Default block index table
pub const DEFAULT_TABLE: &str = "prod-ep-v1-blocks-cars-position";

/// Partition key attribute of the block index
pub const PARTITION_KEY: &str = "blockmultihash";

/// One decoded index row
pub type IndexRecord = serde_json::Map<String, serde_json::Value>;

/// Point query against the index store
#[async_trait]
pub trait IndexQuery: Send + Sync {
    /// All rows in `table` whose partition key equals `multihash`
    async fn query_by_multihash(
        &self,
        table: &str,
        multihash: &str,
    ) -> BackendResult<Vec<IndexRecord>>;
}

/// Index lookup over an [`IndexQuery`]
#[derive(Debug, Clone)]
pub struct IndexLookup<Q> {
    query: Q,
    table: String,
}

impl<Q: IndexQuery> IndexLookup<Q> {
    pub fn new(query: Q, table: impl Into<String>) -> Self {
        Self {
            query,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Every index row recorded for the identifier's multihash
    pub async fn find_records(&self, id: &Identifier) -> BackendResult<Vec<IndexRecord>> {
        self.query
            .query_by_multihash(&self.table, &id.base58_multihash())
            .await
    }
}

#[async_trait]
impl<Q: IndexQuery> Lookup for IndexLookup<Q> {
    type Output = Vec<IndexRecord>;

    fn backend(&self) -> Backend {
        Backend::Index
    }

    async fn lookup(&self, id: &Identifier) -> BackendResult<Option<Vec<IndexRecord>>> {
        let records = self.find_records(id).await?;
        Ok((!records.is_empty()).then_some(records))
    }
}
