/*!
 * Core lookup machinery: identifiers, input, scheduling and grouping
 */

pub mod batch;
pub mod identifier;
pub mod input;
pub mod pipeline;

pub use batch::{batch, BatchExt, Batcher};
pub use identifier::{normalize, Identifier, ParseError};
pub use input::InputSource;
pub use pipeline::{
    AggregatedRecord, BackendOutcomes, Pipeline, DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY,
};
