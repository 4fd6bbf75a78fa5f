/*!
 * Identifier normalization
 *
 * A CID has one multihash but many spellings: legacy v0 (`Qm…`), v1 in any
 * multibase, and the bare multihash the block index is keyed by. Each backend
 * indexed its data under a different spelling, so the pipeline parses once and
 * hands every adapter the form it expects.
 */

use cid::{Cid, Version};
use multibase::Base;
use std::fmt;
use thiserror::Error;

/// Failure to decode a textual identifier. Terminal for that item only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty after trimming
    #[error("empty identifier")]
    Empty,

    /// Input is not a syntactically valid CID
    #[error("invalid CID {input:?}: {reason}")]
    Invalid { input: String, reason: String },
}

/// A parsed content identifier with the spellings each backend needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// The input as given (trimmed)
    raw: String,

    /// The CID as parsed, version preserved
    cid: Cid,

    /// Version-1 form of the same CID
    v1: Cid,
}

impl Identifier {
    /// Parse raw user or stdin text into an identifier
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let cid = Cid::try_from(trimmed).map_err(|e| ParseError::Invalid {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        let v1 = cid.into_v1().map_err(|e| ParseError::Invalid {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            raw: trimmed.to_string(),
            cid,
            v1,
        })
    }

    /// The trimmed input text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the input was a legacy version-0 CID
    pub fn is_legacy(&self) -> bool {
        self.cid.version() == Version::V0
    }

    /// Raw multihash bytes (code, length, digest)
    pub fn multihash_bytes(&self) -> Vec<u8> {
        self.cid.hash().to_bytes()
    }

    /// Multihash in base58btc with the `z` multibase prefix.
    ///
    /// This is the partition key of the block index.
    pub fn base58_multihash(&self) -> String {
        multibase::encode(Base::Base58Btc, self.multihash_bytes())
    }

    /// Canonical version-1 string in base32 lower (`b…`)
    pub fn v1_string(&self) -> String {
        self.v1.to_string()
    }

    /// The original v0 string, only for legacy inputs
    pub fn legacy_string(&self) -> Option<String> {
        self.is_legacy().then(|| self.cid.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse raw text into an [`Identifier`]
pub fn normalize(raw: &str) -> Result<Identifier, ParseError> {
    Identifier::parse(raw)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const V0: &str = "QmdfTbBqBPQ7VNxZEYEj14VmRuZBkqFbiwReogJgS1zR1n";
    pub const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn test_parse_v0() {
        let id = normalize(V0).unwrap();
        assert!(id.is_legacy());
        assert_eq!(id.raw(), V0);
        assert_eq!(id.legacy_string().as_deref(), Some(V0));
        assert!(id.v1_string().starts_with("bafy"));
    }

    #[test]
    fn test_parse_v1() {
        let id = normalize(V1).unwrap();
        assert!(!id.is_legacy());
        assert_eq!(id.legacy_string(), None);
        assert_eq!(id.v1_string(), V1);
    }

    #[test]
    fn test_v0_multihash_is_its_own_base58() {
        // a v0 CID is the bare base58btc multihash, so only the prefix differs
        let id = normalize(V0).unwrap();
        assert_eq!(id.base58_multihash(), format!("z{}", V0));
        assert_eq!(id.multihash_bytes().len(), 34);
        assert_eq!(&id.multihash_bytes()[..2], &[0x12, 0x20]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in [V0, V1] {
            let first = normalize(input).unwrap();
            let second = normalize(&first.v1_string()).unwrap();
            assert_eq!(first.multihash_bytes(), second.multihash_bytes());
            assert_eq!(first.base58_multihash(), second.base58_multihash());
            assert_eq!(first.v1_string(), second.v1_string());
        }
    }

    #[test]
    fn test_v0_and_its_v1_share_index_key() {
        let legacy = normalize(V0).unwrap();
        let upgraded = normalize(&legacy.v1_string()).unwrap();
        assert!(!upgraded.is_legacy());
        assert_eq!(legacy.base58_multihash(), upgraded.base58_multihash());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let id = normalize(&format!("  {}\t", V1)).unwrap();
        assert_eq!(id.raw(), V1);
        assert_eq!(id.to_string(), V1);
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(normalize("   "), Err(ParseError::Empty));

        let err = normalize("not-a-cid").unwrap_err();
        match err {
            ParseError::Invalid { input, .. } => assert_eq!(input, "not-a-cid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
