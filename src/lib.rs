/*!
 * w3stat - what do the backing stores know about a CID?
 *
 * Looks up content identifiers against three stores at once:
 * - the denylist service (HTTP existence check)
 * - the dudewhere root-to-CAR mapping bucket (S3-compatible listing on R2)
 * - the block index (DynamoDB query by multihash)
 *
 * Inputs stream through a bounded-concurrency pipeline that emits one
 * record per input, in input order. Per-item failures are captured in the
 * record; only setup failures stop a run.
 */

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod output;
pub mod protocol;
pub mod runner;
pub mod stats;

// Re-export commonly used types
pub use backend::{Backend, BackendError, Lookup, Outcome};
pub use config::{LookupConfig, R2Credentials};
pub use core::{normalize, AggregatedRecord, Identifier, InputSource, ParseError, Pipeline};
pub use error::{Result, StatError};
pub use stats::PipelineStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
