/*!
 * Bounded fan-out lookup pipeline.
 *
 * For every raw identifier pulled from the input stream the pipeline parses
 * it once, then runs each configured backend lookup concurrently and waits
 * for all of them before emitting one `AggregatedRecord`.
 *
 * Scheduling is a `buffered(concurrency)` stream: at most `concurrency`
 * items are pulled from the input and in flight at once, a new item is pulled
 * only when a slot frees up, and records come out in input order. A slow
 * item holds back later records but never more than `concurrency` items are
 * outstanding against the backends.
 *
 * Failures never escape an item. A parse error becomes the record's outcome;
 * a backend error or timeout becomes that backend's `Outcome::Error` while the
 * other backends' answers are kept.
 */

use crate::backend::{
    Backend, BackendError, DenylistEntry, IndexRecord, Lookup, Outcome,
};
use crate::core::identifier::{normalize, Identifier, ParseError};
use futures::stream::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of identifiers in flight
pub const DEFAULT_CONCURRENCY: usize = 50;

/// Default per-call timeout for a single backend lookup
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

type SharedLookup<T> = Arc<dyn Lookup<Output = T>>;

/// Everything learned about one parsed identifier.
///
/// A `None` field means the command did not ask that backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutcomes {
    pub identifier: Identifier,
    pub denylist: Option<Outcome<DenylistEntry>>,
    /// URL the denylist was asked at, whatever it answered
    pub denylist_url: Option<String>,
    pub dudewhere: Option<Outcome<Vec<String>>>,
    pub index: Option<Outcome<Vec<IndexRecord>>>,
}

impl BackendOutcomes {
    /// Errors captured for this identifier, in backend order
    pub fn errors(&self) -> Vec<&BackendError> {
        let denylist = self.denylist.as_ref().and_then(Outcome::error);
        let dudewhere = self.dudewhere.as_ref().and_then(Outcome::error);
        let index = self.index.as_ref().and_then(Outcome::error);
        [denylist, dudewhere, index].into_iter().flatten().collect()
    }
}

/// One output record per input item
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRecord {
    /// The input exactly as received
    pub input: String,

    /// Parse failure, or the per-backend outcomes
    pub outcome: Result<BackendOutcomes, ParseError>,
}

impl AggregatedRecord {
    pub fn identifier(&self) -> Option<&Identifier> {
        self.outcome.as_ref().ok().map(|o| &o.identifier)
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.outcome.as_ref().err()
    }

    /// `Some(true)` if the denylist answered "present", `Some(false)` if it
    /// answered "absent", `None` if it was not asked or failed.
    pub fn on_denylist(&self) -> Option<bool> {
        match self.outcome.as_ref().ok()?.denylist.as_ref()? {
            Outcome::Found(_) => Some(true),
            Outcome::NotFound => Some(false),
            Outcome::Error(_) => None,
        }
    }
}

/// Concurrency-limited lookup scheduler
#[derive(Clone)]
pub struct Pipeline {
    denylist: Option<SharedLookup<DenylistEntry>>,
    dudewhere: Option<SharedLookup<Vec<String>>>,
    index: Option<SharedLookup<Vec<IndexRecord>>>,
    concurrency: usize,
    call_timeout: Duration,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// A pipeline with no backends and default limits
    pub fn new() -> Self {
        Self {
            denylist: None,
            dudewhere: None,
            index: None,
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_denylist(mut self, lookup: impl Lookup<Output = DenylistEntry> + 'static) -> Self {
        self.denylist = Some(Arc::new(lookup));
        self
    }

    pub fn with_dudewhere(mut self, lookup: impl Lookup<Output = Vec<String>> + 'static) -> Self {
        self.dudewhere = Some(Arc::new(lookup));
        self
    }

    pub fn with_index(mut self, lookup: impl Lookup<Output = Vec<IndexRecord>> + 'static) -> Self {
        self.index = Some(Arc::new(lookup));
        self
    }

    /// Maximum identifiers in flight. 0 is treated as 1.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Upper bound for each individual backend call
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency
    }

    /// Backends this pipeline queries
    pub fn backends(&self) -> Vec<Backend> {
        let mut backends = Vec::with_capacity(3);
        if self.denylist.is_some() {
            backends.push(Backend::Denylist);
        }
        if self.dudewhere.is_some() {
            backends.push(Backend::Dudewhere);
        }
        if self.index.is_some() {
            backends.push(Backend::Index);
        }
        backends
    }

    /// Stream one record per input item, in input order.
    ///
    /// The input is pulled lazily and may be unbounded. The output ends once
    /// the input has ended and every in-flight item has completed.
    pub fn process<'a, S>(&'a self, inputs: S) -> impl Stream<Item = AggregatedRecord> + 'a
    where
        S: Stream<Item = String> + 'a,
    {
        inputs
            .map(move |raw| self.resolve(raw))
            .buffered(self.concurrency)
    }

    /// Parse one raw identifier and query every configured backend
    pub async fn resolve(&self, raw: String) -> AggregatedRecord {
        let identifier = match normalize(&raw) {
            Ok(identifier) => identifier,
            Err(e) => {
                warn!(input = %raw, error = %e, "skipping unparsable identifier");
                return AggregatedRecord {
                    input: raw,
                    outcome: Err(e),
                };
            }
        };

        debug!(cid = %identifier, legacy = identifier.is_legacy(), "looking up");
        let (denylist, dudewhere, index) = tokio::join!(
            self.query(self.denylist.as_deref(), &identifier),
            self.query(self.dudewhere.as_deref(), &identifier),
            self.query(self.index.as_deref(), &identifier),
        );

        let denylist_url = self
            .denylist
            .as_deref()
            .and_then(|lookup| lookup.target(&identifier));

        AggregatedRecord {
            input: raw,
            outcome: Ok(BackendOutcomes {
                identifier,
                denylist,
                denylist_url,
                dudewhere,
                index,
            }),
        }
    }

    /// Run one lookup under the per-call timeout
    async fn query<T>(
        &self,
        lookup: Option<&dyn Lookup<Output = T>>,
        id: &Identifier,
    ) -> Option<Outcome<T>>
    where
        T: Send + 'static,
    {
        let lookup = lookup?;
        let backend = lookup.backend();

        let outcome = match tokio::time::timeout(self.call_timeout, lookup.lookup(id)).await {
            Ok(result) => Outcome::from(result),
            Err(_) => Outcome::Error(BackendError::Timeout {
                backend,
                after: self.call_timeout,
            }),
        };

        if let Outcome::Error(err) = &outcome {
            warn!(cid = %id, %backend, error = %err, "lookup failed");
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendResult;
    use crate::core::identifier::tests::{V0, V1};
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Tracks which identifiers have an outstanding backend call
    #[derive(Default)]
    struct Window {
        open: Mutex<HashMap<String, usize>>,
        peak: AtomicUsize,
    }

    impl Window {
        fn enter(&self, key: &str) {
            let mut open = self.open.lock().unwrap();
            *open.entry(key.to_string()).or_default() += 1;
            self.peak.fetch_max(open.len(), Ordering::SeqCst);
        }

        fn leave(&self, key: &str) {
            let mut open = self.open.lock().unwrap();
            if let Some(count) = open.get_mut(key) {
                *count -= 1;
                if *count == 0 {
                    open.remove(key);
                }
            }
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    /// Lookup that sleeps for a per-input delay then returns a fixed answer
    struct Slow<T> {
        backend: Backend,
        answer: BackendResult<Option<T>>,
        delay: fn(&str) -> Duration,
        window: Arc<Window>,
        calls: AtomicUsize,
    }

    impl<T> Slow<T> {
        fn new(backend: Backend, answer: BackendResult<Option<T>>, window: Arc<Window>) -> Self {
            Self {
                backend,
                answer,
                delay: |_| Duration::from_millis(10),
                window,
                calls: AtomicUsize::new(0),
            }
        }

        fn delay(mut self, delay: fn(&str) -> Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> Lookup for Slow<T> {
        type Output = T;

        fn backend(&self) -> Backend {
            self.backend
        }

        async fn lookup(&self, id: &Identifier) -> BackendResult<Option<T>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.window.enter(id.raw());
            tokio::time::sleep((self.delay)(id.raw())).await;
            self.window.leave(id.raw());
            self.answer.clone()
        }
    }

    /// Distinct valid identifiers, one raw-leaf CID per seed
    fn inputs(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| {
                let digest = [(i % 251) as u8, (i / 251) as u8].repeat(16);
                let mh = cid::multihash::Multihash::<64>::wrap(0x12, &digest).unwrap();
                cid::Cid::new_v1(0x55, mh).to_string()
            })
            .collect()
    }

    /// Deterministic pseudo-random spread derived from the text
    fn spread(raw: &str, modulus: u64) -> u64 {
        raw.bytes().map(u64::from).sum::<u64>().wrapping_mul(7919) % modulus
    }

    fn all_backends(window: &Arc<Window>) -> Pipeline {
        Pipeline::new()
            .with_denylist(Slow::new(Backend::Denylist, Ok(None), window.clone()))
            .with_dudewhere(Slow::new(
                Backend::Dudewhere,
                Ok(Some(vec!["k/a.car".to_string()])),
                window.clone(),
            ))
            .with_index(Slow::new(Backend::Index, Ok(None), window.clone()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_limit() {
        let window = Arc::new(Window::default());
        let pipeline = all_backends(&window).concurrency(4);

        let records: Vec<_> = pipeline
            .process(stream::iter(inputs(40)))
            .collect()
            .await;

        assert_eq!(records.len(), 40);
        assert!(window.peak() <= 4, "peak {} > 4", window.peak());
        assert_eq!(window.peak(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_with_uneven_latency() {
        let window = Arc::new(Window::default());
        let pipeline = Pipeline::new()
            .with_denylist(
                Slow::new(Backend::Denylist, Ok(None), window.clone())
                    .delay(|raw| Duration::from_millis(1 + spread(raw, 200))),
            )
            .with_index(
                Slow::new(Backend::Index, Ok(None), window.clone())
                    .delay(|raw| Duration::from_millis(1 + spread(raw, 50))),
            )
            .concurrency(3);

        let records: Vec<_> = pipeline
            .process(stream::iter(inputs(30)))
            .collect()
            .await;

        assert_eq!(records.len(), 30);
        assert!(window.peak() <= 3, "peak {} > 3", window.peak());
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_follows_input_order() {
        let window = Arc::new(Window::default());
        let pipeline = Pipeline::new()
            .with_denylist(
                Slow::new(Backend::Denylist, Ok(None), window.clone())
                    .delay(|raw| Duration::from_millis(1 + spread(raw, 500))),
            )
            .concurrency(8);

        let sent = inputs(24);
        let received: Vec<String> = pipeline
            .process(stream::iter(sent.clone()))
            .map(|record| record.input)
            .collect()
            .await;

        assert_eq!(received, sent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_concurrency_is_sequential() {
        let window = Arc::new(Window::default());
        let pipeline = all_backends(&window).concurrency(0);
        assert_eq!(pipeline.concurrency_limit(), 1);

        let count = pipeline.process(stream::iter(inputs(5))).count().await;
        assert_eq!(count, 5);
        assert_eq!(window.peak(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_input_is_pulled_lazily() {
        let window = Arc::new(Window::default());
        let pipeline = all_backends(&window).concurrency(5);
        let pulled = AtomicUsize::new(0);

        let endless = stream::repeat(V1.to_string()).inspect(|_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        });
        let first: Vec<_> = pipeline.process(endless).take(3).collect().await;

        assert_eq!(first.len(), 3);
        assert!(pulled.load(Ordering::SeqCst) <= 3 + 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parse_error_skips_backends() {
        let window = Arc::new(Window::default());
        let denylist = Slow::new(Backend::Denylist, Ok(None::<DenylistEntry>), window.clone());
        let pipeline = Pipeline::new().with_denylist(denylist);

        let record = pipeline.resolve("not-a-cid".to_string()).await;
        assert_eq!(record.input, "not-a-cid");
        assert!(record.parse_error().is_some());
        assert!(record.identifier().is_none());
        assert_eq!(record.on_denylist(), None);
        assert_eq!(window.peak(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_captured_per_backend() {
        let window = Arc::new(Window::default());
        let pipeline = Pipeline::new()
            .with_denylist(Slow::new(
                Backend::Denylist,
                Ok(Some(DenylistEntry { url: "u".into() })),
                window.clone(),
            ))
            .with_index(
                Slow::new(Backend::Index, Ok(None), window.clone())
                    .delay(|_| Duration::from_secs(120)),
            )
            .call_timeout(Duration::from_secs(5));

        let record = pipeline.resolve(V0.to_string()).await;
        let outcomes = record.outcome.as_ref().unwrap();

        assert_eq!(record.on_denylist(), Some(true));
        assert!(outcomes.dudewhere.is_none());
        assert_eq!(
            outcomes.index,
            Some(Outcome::Error(BackendError::Timeout {
                backend: Backend::Index,
                after: Duration::from_secs(5),
            }))
        );
        assert_eq!(outcomes.errors().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookups_for_one_item_overlap() {
        let window = Arc::new(Window::default());
        let one_second: fn(&str) -> Duration = |_| Duration::from_secs(1);
        let pipeline = Pipeline::new()
            .with_denylist(
                Slow::new(Backend::Denylist, Ok(None::<DenylistEntry>), window.clone())
                    .delay(one_second),
            )
            .with_dudewhere(
                Slow::new(Backend::Dudewhere, Ok(None::<Vec<String>>), window.clone())
                    .delay(one_second),
            )
            .with_index(
                Slow::new(Backend::Index, Ok(None::<Vec<IndexRecord>>), window.clone())
                    .delay(one_second),
            );

        let started = tokio::time::Instant::now();
        pipeline.resolve(V1.to_string()).await;
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[test]
    fn test_selected_backends() {
        let window = Arc::new(Window::default());
        assert!(Pipeline::new().backends().is_empty());
        assert_eq!(
            all_backends(&window).backends(),
            vec![Backend::Denylist, Backend::Dudewhere, Backend::Index]
        );
        assert_eq!(Pipeline::default().concurrency_limit(), DEFAULT_CONCURRENCY);
    }
}
