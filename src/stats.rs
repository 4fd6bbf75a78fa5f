/*!
 * Run summary counters
 */

use crate::backend::{Backend, BackendError};
use crate::core::AggregatedRecord;
use std::time::Duration;
use tracing::info;

/// Counters accumulated over one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub records: usize,
    pub parse_failures: usize,
    pub on_denylist: usize,
    pub denylist_errors: usize,
    pub dudewhere_errors: usize,
    pub index_errors: usize,
    pub timeouts: usize,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the counters
    pub fn record(&mut self, record: &AggregatedRecord) {
        self.records += 1;

        let outcomes = match &record.outcome {
            Ok(outcomes) => outcomes,
            Err(_) => {
                self.parse_failures += 1;
                return;
            }
        };

        if record.on_denylist() == Some(true) {
            self.on_denylist += 1;
        }

        for err in outcomes.errors() {
            match err.backend() {
                Backend::Denylist => self.denylist_errors += 1,
                Backend::Dudewhere => self.dudewhere_errors += 1,
                Backend::Index => self.index_errors += 1,
            }
            if matches!(err, BackendError::Timeout { .. }) {
                self.timeouts += 1;
            }
        }
    }

    /// Errors across all backends
    pub fn backend_errors(&self) -> usize {
        self.denylist_errors + self.dudewhere_errors + self.index_errors
    }

    /// Records whose identifier parsed
    pub fn parsed_records(&self) -> usize {
        self.records.saturating_sub(self.parse_failures)
    }

    /// Emit the summary at info level
    pub fn log_summary(&self, elapsed: Duration) {
        info!(
            records = self.records,
            parse_failures = self.parse_failures,
            on_denylist = self.on_denylist,
            denylist_errors = self.denylist_errors,
            dudewhere_errors = self.dudewhere_errors,
            index_errors = self.index_errors,
            timeouts = self.timeouts,
            elapsed_ms = elapsed.as_millis() as u64,
            "lookup run complete"
        );
    }
}
