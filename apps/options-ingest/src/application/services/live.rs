//! Live Pipeline
//!
//! Tick handler for a single-contract live session: drops incomplete and
//! repeated notifications, then emits a canonical payload per trade.

use crate::application::ports::{EmitError, LiveTick, PayloadSink, QualifiedContract, TickHandler};
use crate::domain::dedup::{DedupKey, DedupTracker};
use crate::domain::payload::{DropReason, payload_from_record};
use crate::domain::record::{Conditions, SymbolValue, TradeRecord};
use crate::domain::timestamp::{TimeValue, normalize_ts, now_millis};
use crate::infrastructure::metrics::{self, Pipeline};

/// Exchange reported when neither the trade nor the contract names one.
pub const DEFAULT_LIVE_EXCHANGE: &str = "OPRA";

/// Counters for one live session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LiveStats {
    /// Notifications received.
    pub received: u64,
    /// Payloads written.
    pub emitted: u64,
    /// Notifications without price or size.
    pub incomplete: u64,
    /// Repeats of the previous accepted trade.
    pub duplicates: u64,
}

/// Converts live ticks for one contract into payloads.
pub struct LiveTickHandler<S> {
    sink: S,
    symbol: String,
    fallback_exchange: String,
    dedup: DedupTracker,
    stats: LiveStats,
}

impl<S: PayloadSink> LiveTickHandler<S> {
    /// Create a handler for `contract`, writing to `sink`.
    #[must_use]
    pub fn new(sink: S, contract: &QualifiedContract) -> Self {
        let fallback_exchange = contract
            .exchange
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_LIVE_EXCHANGE)
            .to_string();

        Self {
            sink,
            symbol: contract.symbol.clone(),
            fallback_exchange,
            dedup: DedupTracker::new(),
            stats: LiveStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> LiveStats {
        self.stats
    }

    /// The output sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the handler, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn drop_tick(reason: DropReason) {
        metrics::record_dropped(Pipeline::Live, reason);
        tracing::trace!(reason = reason.as_str(), "Dropped live tick");
    }
}

impl<S: PayloadSink> TickHandler for LiveTickHandler<S> {
    fn on_tick(&mut self, tick: &LiveTick) -> Result<(), EmitError> {
        self.stats.received += 1;
        metrics::record_received(Pipeline::Live);

        let ts = normalize_ts(&tick.time).unwrap_or_else(now_millis);

        let Some(key) = DedupKey::from_parts(ts, tick.price, tick.size) else {
            self.stats.incomplete += 1;
            Self::drop_tick(if tick.price.is_none() {
                DropReason::Price
            } else {
                DropReason::Size
            });
            return Ok(());
        };

        if !self.dedup.accept(key) {
            self.stats.duplicates += 1;
            Self::drop_tick(DropReason::Duplicate);
            return Ok(());
        }

        let trade = LiveTrade {
            key,
            symbol: tick
                .symbol
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(&self.symbol),
            exchange: tick
                .exchange
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or(&self.fallback_exchange),
            conditions: &tick.conditions,
        };

        match payload_from_record(&trade, None) {
            Ok(payload) => {
                self.sink.emit(&payload)?;
                self.stats.emitted += 1;
                metrics::record_emitted(Pipeline::Live);
            }
            Err(reason) => Self::drop_tick(reason),
        }
        Ok(())
    }
}

/// An accepted live trade, viewed as a provider record.
struct LiveTrade<'a> {
    key: DedupKey,
    symbol: &'a str,
    exchange: &'a str,
    conditions: &'a [String],
}

impl TradeRecord for LiveTrade<'_> {
    fn ts_event(&self) -> TimeValue {
        TimeValue::Integer(self.key.ts)
    }

    fn price(&self) -> Option<f64> {
        Some(self.key.price)
    }

    fn size(&self) -> Option<i64> {
        Some(self.key.size)
    }

    fn symbol(&self) -> Option<SymbolValue> {
        Some(SymbolValue::Text(self.symbol.to_string()))
    }

    fn exchange(&self) -> Option<String> {
        Some(self.exchange.to_string())
    }

    fn conditions(&self) -> Option<Conditions> {
        Some(Conditions::Many(self.conditions.to_vec()))
    }
}
