//! Backend lookup adapters
//!
//! Each backing store is reached through the same capability, [`Lookup`]:
//! take a parsed [`Identifier`], return what the store knows about it. The
//! three implementations differ only in which spelling of the identifier they
//! send and how they read the answer.
//!
//! | backend   | key sent                         | found when            |
//! |-----------|----------------------------------|-----------------------|
//! | denylist  | v1 base32 string                 | HTTP 2xx              |
//! | dudewhere | `{v1}/` prefix, then v0 fallback | listing non-empty     |
//! | index     | base58btc multihash              | query returns rows    |

mod error;

pub mod denylist;
pub mod dudewhere;
pub mod index;

pub use denylist::{DenylistEntry, DenylistLookup};
pub use dudewhere::{DudewhereLookup, ObjectLister};
pub use error::{Backend, BackendError, BackendResult};
pub use index::{IndexLookup, IndexQuery, IndexRecord};

use crate::core::identifier::Identifier;
use async_trait::async_trait;

/// A read-only query against one backing store.
///
/// `Ok(None)` is the definitive "not known here" answer; `Err` is reserved
/// for failures where the store could not answer at all.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// What a positive answer carries
    type Output: Send + 'static;

    /// Which backend this is
    fn backend(&self) -> Backend;

    /// Ask the backend about one identifier
    async fn lookup(&self, id: &Identifier) -> BackendResult<Option<Self::Output>>;

    /// Address queried for `id`, for backends that ask a single URL
    fn target(&self, _id: &Identifier) -> Option<String> {
        None
    }
}

/// Per-backend outcome as recorded in an aggregated record
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Found(T),
    NotFound,
    Error(BackendError),
}

impl<T> Outcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Outcome::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&BackendError> {
        match self {
            Outcome::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<BackendResult<Option<T>>> for Outcome<T> {
    fn from(result: BackendResult<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Outcome::Found(value),
            Ok(None) => Outcome::NotFound,
            Err(err) => Outcome::Error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_result() {
        let found: Outcome<u32> = Ok(Some(7)).into();
        assert_eq!(found.found(), Some(&7));
        assert!(found.is_found());

        let absent: Outcome<u32> = Ok(None).into();
        assert_eq!(absent, Outcome::NotFound);
        assert!(!absent.is_error());

        let failed: Outcome<u32> = Err(BackendError::transport(Backend::Index, "reset")).into();
        assert!(failed.is_error());
        assert_eq!(failed.error().map(|e| e.backend()), Some(Backend::Index));
    }
}
