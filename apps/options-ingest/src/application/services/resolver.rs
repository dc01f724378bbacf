//! Symbol Resolver
//!
//! Collects unresolved instrument identifiers and resolves them in batches
//! against the [`SymbologyPort`], caching every mapping it learns.

use chrono::NaiveDate;

use crate::application::ports::{ResolveRequest, SymbologyError, SymbologyPort};
use crate::domain::symbology::{
    DEFAULT_RESOLVE_BATCH_SIZE, DateWindow, InstrumentId, PendingQueue, ResolutionCache,
};
use crate::infrastructure::metrics;

/// Batched, date-scoped identifier resolver.
pub struct SymbolResolver<P> {
    port: P,
    dataset: String,
    window: DateWindow,
    batch_size: usize,
    pending: PendingQueue,
    cache: ResolutionCache,
    batches: u64,
}

impl<P: SymbologyPort> SymbolResolver<P> {
    /// Create a resolver for `dataset`, scoped to `window`.
    #[must_use]
    pub fn new(port: P, dataset: impl Into<String>, window: DateWindow) -> Self {
        Self {
            port,
            dataset: dataset.into(),
            window,
            batch_size: DEFAULT_RESOLVE_BATCH_SIZE,
            pending: PendingQueue::new(),
            cache: ResolutionCache::new(),
            batches: 0,
        }
    }

    /// Override the per-request identifier limit (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Queue an identifier for the next batch. No-op if already queued.
    pub fn queue(&mut self, instrument_id: InstrumentId) -> bool {
        self.pending.push(instrument_id)
    }

    /// Number of identifiers awaiting resolution.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Cached symbol for `(instrument_id, date)`. Never triggers a lookup.
    #[must_use]
    pub fn lookup(&self, instrument_id: InstrumentId, date: NaiveDate) -> Option<&str> {
        self.cache.lookup(instrument_id, date)
    }

    /// Resolve everything queued, in requests of at most `batch_size` ids.
    ///
    /// The queue is drained before the first request goes out; identifiers
    /// queued afterwards belong to the next call. Returns the number of new
    /// mappings cached.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure. Remaining chunks are not sent.
    pub async fn resolve_pending(&mut self) -> Result<usize, SymbologyError> {
        let pending = self.pending.take();
        if pending.is_empty() {
            return Ok(0);
        }

        let mut learned = 0;
        for chunk in pending.chunks(self.batch_size) {
            let request =
                ResolveRequest::instrument_ids(self.dataset.clone(), chunk.to_vec(), self.window);

            tracing::debug!(
                dataset = %self.dataset,
                ids = chunk.len(),
                start = %self.window.start,
                end = ?self.window.end,
                "Resolving instrument identifiers"
            );

            let mappings = self.port.resolve(&request).await?;
            let added = self.cache.merge(mappings);
            self.batches += 1;
            learned += added;

            metrics::record_resolution_batch(chunk.len());
            metrics::record_symbols_resolved(added);
        }

        tracing::debug!(learned, cached = self.cache.len(), "Resolution complete");
        Ok(learned)
    }

    /// Number of lookup requests sent so far.
    #[must_use]
    pub const fn batches(&self) -> u64 {
        self.batches
    }
}
