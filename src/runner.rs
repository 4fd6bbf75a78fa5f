/*!
 * Drives a pipeline from an input stream to an output writer
 */

use crate::core::{normalize, BatchExt, Pipeline};
use crate::output::OutputWriter;
use crate::stats::PipelineStats;
use futures::stream::{Stream, StreamExt};
use std::io::{self, Write};
use std::time::Instant;
use tracing::debug;

/// Look up every input and write one record per input.
///
/// With `batch` set, records are grouped and written as one array per group.
/// Returns the run counters; an output error stops the run.
pub async fn run_lookups<S, W>(
    pipeline: &Pipeline,
    inputs: S,
    writer: &mut OutputWriter<W>,
    batch: Option<usize>,
) -> io::Result<PipelineStats>
where
    S: Stream<Item = String>,
    W: Write,
{
    let started = Instant::now();
    let mut stats = PipelineStats::new();
    debug!(
        backends = ?pipeline.backends(),
        concurrency = pipeline.concurrency_limit(),
        "starting lookups"
    );

    let records = pipeline.process(inputs);
    match batch {
        Some(size) => {
            let mut groups = std::pin::pin!(records.batched(size));
            while let Some(group) = groups.next().await {
                group.iter().for_each(|record| stats.record(record));
                writer.batch(&group)?;
            }
        }
        None => {
            let mut records = std::pin::pin!(records);
            while let Some(record) = records.next().await {
                stats.record(&record);
                writer.record(&record)?;
            }
        }
    }

    stats.log_summary(started.elapsed());
    Ok(stats)
}

/// Print the base58btc multihash of every input. No backend is contacted.
pub async fn run_multihash<S, W>(inputs: S, writer: &mut OutputWriter<W>) -> io::Result<usize>
where
    S: Stream<Item = String>,
    W: Write,
{
    let mut inputs = std::pin::pin!(inputs);
    let mut count = 0;
    while let Some(raw) = inputs.next().await {
        writer.multihash(&raw, &normalize(&raw))?;
        count += 1;
    }
    Ok(count)
}
