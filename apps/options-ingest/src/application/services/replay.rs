//! Replay Pipeline
//!
//! Pulls historical records one at a time and emits canonical payloads.
//! Records that already carry a readable symbol go straight out. Records
//! keyed only by a numeric instrument identifier are held in a buffer until
//! the [`SymbolResolver`] has looked the identifier up.
//!
//! # Flush Triggers
//!
//! | Trigger                                    | Unresolved entries  |
//! |--------------------------------------------|---------------------|
//! | pending identifiers reach the id limit     | stay buffered       |
//! | buffered records reach the record limit    | stay buffered       |
//! | still at the record limit after that flush | emitted with raw id |
//! | end of stream                              | emitted with raw id |
//!
//! The third row is a second flush run immediately, while handling the
//! same record that filled the buffer. There is no later retry for those
//! entries.
//!
//! The identifier limit bounds lookup cost; the record limit bounds memory.
//! Many buffered records can share a handful of identifiers, so the two are
//! tracked separately.

use chrono::NaiveDate;

use crate::application::ports::{
    EmitError, PayloadSink, RecordSource, SourceError, SymbologyError, SymbologyPort,
};
use crate::application::services::resolver::SymbolResolver;
use crate::domain::payload::{DropReason, build_payload};
use crate::domain::record::{TradeFields, TradeRecord};
use crate::domain::symbology::{DEFAULT_RESOLVE_BATCH_SIZE, InstrumentId};
use crate::domain::timestamp::{normalize_ts, utc_date};
use crate::infrastructure::metrics::{self, Pipeline};

// =============================================================================
// Configuration
// =============================================================================

/// Buffering thresholds for the replay pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSettings {
    /// Flush once this many distinct identifiers await resolution.
    pub pending_id_threshold: usize,
    /// Flush once this many records are buffered.
    pub buffered_record_threshold: usize,
    /// Maximum identifiers per lookup request.
    pub resolve_batch_size: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            pending_id_threshold: 200,
            buffered_record_threshold: 2000,
            resolve_batch_size: DEFAULT_RESOLVE_BATCH_SIZE,
        }
    }
}

// =============================================================================
// Errors and Stats
// =============================================================================

/// Fatal replay failure.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// Symbol lookup failed.
    #[error(transparent)]
    Symbology(#[from] SymbologyError),

    /// Record stream failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Output failed.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Counters for one replay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records pulled from the source.
    pub received: u64,
    /// Payloads written.
    pub emitted: u64,
    /// Records silently dropped.
    pub dropped: u64,
    /// Payloads written with a raw identifier as the symbol.
    pub fallback: u64,
    /// Lookup requests sent.
    pub batches: u64,
}

/// A record waiting for its identifier to resolve.
#[derive(Debug)]
struct PendingEntry {
    fields: TradeFields,
    instrument_id: InstrumentId,
    date: NaiveDate,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Buffer coordinator for the replay pipeline.
pub struct ReplayCoordinator<P, S> {
    resolver: SymbolResolver<P>,
    sink: S,
    settings: BufferSettings,
    buffer: Vec<PendingEntry>,
    stats: ReplayStats,
}

impl<P: SymbologyPort, S: PayloadSink> ReplayCoordinator<P, S> {
    /// Create a coordinator writing to `sink`.
    #[must_use]
    pub fn new(resolver: SymbolResolver<P>, sink: S, settings: BufferSettings) -> Self {
        Self {
            resolver: resolver.with_batch_size(settings.resolve_batch_size),
            sink,
            settings,
            buffer: Vec::new(),
            stats: ReplayStats::default(),
        }
    }

    /// Drain `source` to completion, then force-flush.
    ///
    /// # Errors
    ///
    /// Returns the first source, lookup or output failure.
    pub async fn run<Src>(&mut self, source: &mut Src) -> Result<ReplayStats, ReplayError>
    where
        Src: RecordSource + ?Sized,
    {
        while let Some(record) = source.next_record().await? {
            self.ingest(&record).await?;
        }
        self.finish().await
    }

    /// Handle one record.
    ///
    /// # Errors
    ///
    /// Returns a lookup or output failure.
    pub async fn ingest<R>(&mut self, record: &R) -> Result<(), ReplayError>
    where
        R: TradeRecord + ?Sized,
    {
        self.stats.received += 1;
        metrics::record_received(Pipeline::Replay);

        self.route(TradeFields::probe(record)).await?;

        let limit = self.settings.buffered_record_threshold;
        if self.buffer.len() >= limit {
            self.flush(false).await?;
            if self.buffer.len() >= limit {
                tracing::warn!(
                    buffered = self.buffer.len(),
                    limit,
                    "Buffer still full after resolution, emitting raw identifiers"
                );
                self.flush(true).await?;
            }
        }
        Ok(())
    }

    async fn route(&mut self, fields: TradeFields) -> Result<(), ReplayError> {
        let Some(date) = normalize_ts(&fields.ts_event).and_then(utc_date) else {
            self.drop_record(DropReason::Timestamp);
            return Ok(());
        };

        let Some(instrument_id) = fields.numeric_symbol() else {
            if let Some(symbol) = fields.symbol.as_ref().filter(|s| s.is_oversized_id()) {
                tracing::debug!(
                    symbol = %symbol.render(),
                    "Digit symbol exceeds the identifier range, emitting as text"
                );
            }
            self.emit(&fields, None)?;
            return Ok(());
        };

        if let Some(symbol) = self.resolver.lookup(instrument_id, date) {
            Self::emit_to(&mut self.sink, &mut self.stats, &fields, Some(symbol))?;
            return Ok(());
        }

        self.resolver.queue(instrument_id);
        self.buffer.push(PendingEntry {
            fields,
            instrument_id,
            date,
        });
        metrics::set_buffered_records(self.buffer.len());

        if self.resolver.pending_count() >= self.settings.pending_id_threshold {
            self.flush(false).await?;
        }
        Ok(())
    }

    /// Resolve pending identifiers and emit every buffered record that now
    /// has a symbol. With `force`, unresolved records are emitted with their
    /// raw identifier instead of staying buffered.
    ///
    /// # Errors
    ///
    /// Returns a lookup or output failure.
    pub async fn flush(&mut self, force: bool) -> Result<(), ReplayError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.resolver.resolve_pending().await?;
        self.stats.batches = self.resolver.batches();

        let entries = std::mem::take(&mut self.buffer);
        let mut remaining = Vec::new();
        for entry in entries {
            if let Some(symbol) = self.resolver.lookup(entry.instrument_id, entry.date) {
                Self::emit_to(&mut self.sink, &mut self.stats, &entry.fields, Some(symbol))?;
            } else if force {
                let fallback = entry.instrument_id.to_string();
                self.stats.fallback += 1;
                metrics::record_fallback_symbol();
                Self::emit_to(&mut self.sink, &mut self.stats, &entry.fields, Some(&fallback))?;
            } else {
                remaining.push(entry);
            }
        }

        tracing::debug!(
            force,
            emitted = self.stats.emitted,
            still_buffered = remaining.len(),
            "Flushed replay buffer"
        );

        self.buffer = remaining;
        metrics::set_buffered_records(self.buffer.len());
        Ok(())
    }

    /// End-of-stream flush. Nothing stays buffered afterwards.
    ///
    /// # Errors
    ///
    /// Returns a lookup or output failure.
    pub async fn finish(&mut self) -> Result<ReplayStats, ReplayError> {
        self.flush(true).await?;
        Ok(self.stats)
    }

    /// Number of records awaiting resolution.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// The output sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the coordinator, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn emit(&mut self, fields: &TradeFields, symbol: Option<&str>) -> Result<(), EmitError> {
        Self::emit_to(&mut self.sink, &mut self.stats, fields, symbol)
    }

    fn emit_to(
        sink: &mut S,
        stats: &mut ReplayStats,
        fields: &TradeFields,
        symbol: Option<&str>,
    ) -> Result<(), EmitError> {
        match build_payload(fields, symbol) {
            Ok(payload) => {
                sink.emit(&payload)?;
                stats.emitted += 1;
                metrics::record_emitted(Pipeline::Replay);
            }
            Err(reason) => {
                stats.dropped += 1;
                metrics::record_dropped(Pipeline::Replay, reason);
                tracing::trace!(reason = reason.as_str(), "Dropped replay record");
            }
        }
        Ok(())
    }

    fn drop_record(&mut self, reason: DropReason) {
        self.stats.dropped += 1;
        metrics::record_dropped(Pipeline::Replay, reason);
        tracing::trace!(reason = reason.as_str(), "Dropped replay record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockSymbologyPort, ResolveRequest};
    use crate::domain::payload::CanonicalPayload;
    use crate::domain::record::SymbolValue;
    use crate::domain::symbology::{DateWindow, SymbolInterval, SymbolMapping};
    use crate::domain::timestamp::TimeValue;

    // 2024-01-02T14:30:00Z in nanoseconds.
    const TS_NS: i64 = 1_704_205_800_000_000_000;

    struct Trade {
        ts: i64,
        price: Option<f64>,
        symbol: SymbolValue,
    }

    impl TradeRecord for Trade {
        fn ts_event(&self) -> TimeValue {
            TimeValue::Integer(self.ts)
        }
        fn price(&self) -> Option<f64> {
            self.price
        }
        fn size(&self) -> Option<i64> {
            Some(1)
        }
        fn symbol(&self) -> Option<SymbolValue> {
            Some(self.symbol.clone())
        }
        fn publisher_id(&self) -> Option<String> {
            Some("30".to_string())
        }
    }

    fn id_trade(id: InstrumentId) -> Trade {
        Trade {
            ts: TS_NS,
            price: Some(1.5),
            symbol: SymbolValue::Id(id),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn resolved(request: &ResolveRequest) -> Vec<SymbolMapping> {
        request
            .instrument_ids
            .iter()
            .map(|id| SymbolMapping {
                instrument_id: *id,
                interval: SymbolInterval {
                    start: day(2),
                    end: day(3),
                    symbol: format!("OPT{id}"),
                },
            })
            .collect()
    }

    fn coordinator(
        port: MockSymbologyPort,
        settings: BufferSettings,
    ) -> ReplayCoordinator<MockSymbologyPort, Vec<CanonicalPayload>> {
        let window = DateWindow {
            start: day(2),
            end: None,
        };
        ReplayCoordinator::new(
            SymbolResolver::new(port, "OPRA.PILLAR", window),
            Vec::new(),
            settings,
        )
    }

    #[tokio::test]
    async fn readable_symbol_is_emitted_directly() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve().never();
        let mut replay = coordinator(port, BufferSettings::default());

        let trade = Trade {
            ts: TS_NS,
            price: Some(2.0),
            symbol: SymbolValue::Text("SPY   240119C00470000".to_string()),
        };
        replay.ingest(&trade).await.unwrap();

        assert_eq!(replay.buffered(), 0);
        assert_eq!(replay.sink().len(), 1);
        assert_eq!(replay.sink()[0].symbol, "SPY   240119C00470000");
        assert_eq!(replay.sink()[0].exchange.as_deref(), Some("30"));
        assert_eq!(replay.sink()[0].ts, 1_704_205_800_000);
    }

    #[tokio::test]
    async fn numeric_symbol_is_buffered_until_finish() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve()
            .times(1)
            .returning(|req| Ok(resolved(req)));
        let mut replay = coordinator(port, BufferSettings::default());

        replay.ingest(&id_trade(11)).await.unwrap();
        replay.ingest(&id_trade(11)).await.unwrap();
        assert_eq!(replay.buffered(), 2);
        assert!(replay.sink().is_empty());

        let stats = replay.finish().await.unwrap();
        assert_eq!(stats.emitted, 2);
        assert_eq!(stats.fallback, 0);
        assert!(replay.sink().iter().all(|p| p.symbol == "OPT11"));
    }

    #[tokio::test]
    async fn cached_identifier_skips_buffer() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve()
            .times(1)
            .returning(|req| Ok(resolved(req)));
        let settings = BufferSettings {
            pending_id_threshold: 1,
            ..BufferSettings::default()
        };
        let mut replay = coordinator(port, settings);

        replay.ingest(&id_trade(5)).await.unwrap();
        assert_eq!(replay.sink().len(), 1);

        replay.ingest(&id_trade(5)).await.unwrap();
        assert_eq!(replay.buffered(), 0);
        assert_eq!(replay.sink().len(), 2);
        assert_eq!(replay.sink()[1].symbol, "OPT5");
    }

    #[tokio::test]
    async fn unresolved_identifier_falls_back_at_finish() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve().times(1).returning(|_| Ok(Vec::new()));
        let mut replay = coordinator(port, BufferSettings::default());

        replay.ingest(&id_trade(987_654)).await.unwrap();
        let stats = replay.finish().await.unwrap();

        assert_eq!(stats.fallback, 1);
        assert_eq!(replay.sink()[0].symbol, "987654");
        assert_eq!(replay.buffered(), 0);
    }

    #[tokio::test]
    async fn record_limit_forces_raw_identifiers_when_unresolvable() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve().returning(|_| Ok(Vec::new()));
        let settings = BufferSettings {
            pending_id_threshold: 100,
            buffered_record_threshold: 3,
            resolve_batch_size: 10,
        };
        let mut replay = coordinator(port, settings);

        for _ in 0..2 {
            replay.ingest(&id_trade(77)).await.unwrap();
        }
        assert_eq!(replay.buffered(), 2);
        assert!(replay.sink().is_empty());

        // The record that fills the buffer triggers both flushes.
        replay.ingest(&id_trade(77)).await.unwrap();

        assert_eq!(replay.buffered(), 0);
        assert_eq!(replay.stats().fallback, 3);
        assert!(replay.sink().iter().all(|p| p.symbol == "77"));
    }

    #[tokio::test]
    async fn oversized_digit_symbol_is_emitted_as_text() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve().never();
        let mut replay = coordinator(port, BufferSettings::default());

        let trade = Trade {
            ts: TS_NS,
            price: Some(1.5),
            symbol: SymbolValue::Text("4294967296".to_string()),
        };
        replay.ingest(&trade).await.unwrap();
        replay.finish().await.unwrap();

        assert_eq!(replay.buffered(), 0);
        assert_eq!(replay.sink().len(), 1);
        assert_eq!(replay.sink()[0].symbol, "4294967296");
    }

    #[tokio::test]
    async fn missing_price_never_emits() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve().returning(|req| Ok(resolved(req)));
        let mut replay = coordinator(port, BufferSettings::default());

        let trade = Trade {
            ts: TS_NS,
            price: None,
            symbol: SymbolValue::Id(3),
        };
        replay.ingest(&trade).await.unwrap();
        let stats = replay.finish().await.unwrap();

        assert!(replay.sink().is_empty());
        assert_eq!(stats.dropped, 1);
    }

    #[tokio::test]
    async fn unrepresentable_timestamp_is_dropped_before_buffering() {
        let mut port = MockSymbologyPort::new();
        port.expect_resolve().never();
        let mut replay = coordinator(port, BufferSettings::default());

        // Millisecond value outside the representable calendar range.
        let far = Trade {
            ts: i64::MIN,
            price: Some(1.0),
            symbol: SymbolValue::Id(3),
        };
        replay.ingest(&far).await.unwrap();

        assert_eq!(replay.buffered(), 0);
        assert_eq!(replay.stats().dropped, 1);
    }
}
