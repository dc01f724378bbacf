//! Instrument Symbology
//!
//! Pure state behind deferred symbol resolution: the deduplicated queue of
//! identifiers awaiting lookup, the date window lookups are scoped to, and
//! the cache of resolved `(instrument_id, date) -> symbol` mappings.
//!
//! # Cache Semantics
//!
//! The lookup service answers with date intervals per identifier (an
//! option's raw symbol can change across a corporate action). The cache keeps
//! those intervals per identifier, append-only. Lookups return the first
//! interval containing the date, so a later batch can add coverage for new
//! dates but never changes the answer for a key that was already resolvable.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::domain::timestamp::parse_date;

/// Provider-internal numeric instrument identifier.
pub type InstrumentId = u32;

/// Maximum identifiers submitted in a single lookup request.
pub const DEFAULT_RESOLVE_BATCH_SIZE: usize = 2000;

// =============================================================================
// Date Window
// =============================================================================

/// Date range a resolution batch is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// First date (inclusive).
    pub start: NaiveDate,
    /// Last date, or `None` for unbounded.
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Derive the window from the user-supplied replay bounds.
    ///
    /// An absent or unparseable start falls back to `today`; an absent or
    /// unparseable end leaves the window unbounded.
    #[must_use]
    pub fn from_bounds(start: &str, end: Option<&str>, today: NaiveDate) -> Self {
        Self {
            start: parse_date(start).unwrap_or(today),
            end: end.and_then(parse_date),
        }
    }
}

// =============================================================================
// Resolved Mappings
// =============================================================================

/// A symbol valid for an identifier over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInterval {
    /// First valid date (inclusive).
    pub start: NaiveDate,
    /// End date (exclusive).
    pub end: NaiveDate,
    /// Resolved symbol.
    pub symbol: String,
}

impl SymbolInterval {
    /// Whether `date` falls inside this interval.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// One entry returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMapping {
    /// Identifier the interval belongs to.
    pub instrument_id: InstrumentId,
    /// Validity interval and symbol.
    pub interval: SymbolInterval,
}

/// Append-only cache of resolved mappings.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    intervals: HashMap<InstrumentId, Vec<SymbolInterval>>,
}

impl ResolutionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping. Returns `false` if it was already known or empty.
    pub fn insert(&mut self, mapping: SymbolMapping) -> bool {
        let SymbolMapping {
            instrument_id,
            interval,
        } = mapping;
        if interval.symbol.is_empty() || interval.start >= interval.end {
            return false;
        }
        let known = self.intervals.entry(instrument_id).or_default();
        if known.contains(&interval) {
            return false;
        }
        known.push(interval);
        true
    }

    /// Merge a batch of mappings, returning how many were new.
    pub fn merge<I>(&mut self, mappings: I) -> usize
    where
        I: IntoIterator<Item = SymbolMapping>,
    {
        mappings
            .into_iter()
            .map(|m| self.insert(m))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Symbol for `instrument_id` on `date`, if resolved.
    #[must_use]
    pub fn lookup(&self, instrument_id: InstrumentId, date: NaiveDate) -> Option<&str> {
        self.intervals
            .get(&instrument_id)?
            .iter()
            .find(|interval| interval.contains(date))
            .map(|interval| interval.symbol.as_str())
    }

    /// Number of identifiers with at least one interval.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether nothing has been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

// =============================================================================
// Pending Queue
// =============================================================================

/// Insertion-ordered set of identifiers awaiting the next batch.
#[derive(Debug, Default)]
pub struct PendingQueue {
    order: Vec<InstrumentId>,
    members: HashSet<InstrumentId>,
}

impl PendingQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an identifier. Returns `false` if it was already queued.
    pub fn push(&mut self, instrument_id: InstrumentId) -> bool {
        if !self.members.insert(instrument_id) {
            return false;
        }
        self.order.push(instrument_id);
        true
    }

    /// Whether an identifier is queued.
    #[must_use]
    pub fn contains(&self, instrument_id: InstrumentId) -> bool {
        self.members.contains(&instrument_id)
    }

    /// Number of queued identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drain the queue in insertion order, clearing the membership set.
    pub fn take(&mut self) -> Vec<InstrumentId> {
        self.members.clear();
        std::mem::take(&mut self.order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mapping(id: InstrumentId, start: NaiveDate, end: NaiveDate, symbol: &str) -> SymbolMapping {
        SymbolMapping {
            instrument_id: id,
            interval: SymbolInterval {
                start,
                end,
                symbol: symbol.to_string(),
            },
        }
    }

    #[test]
    fn window_with_start_only_is_unbounded() {
        let window = DateWindow::from_bounds("2024-01-02", None, date(2030, 1, 1));
        assert_eq!(window.start, date(2024, 1, 2));
        assert_eq!(window.end, None);
    }

    #[test]
    fn window_from_datetime_bounds() {
        let window = DateWindow::from_bounds(
            "2024-01-02T09:30:00",
            Some("2024-01-05"),
            date(2030, 1, 1),
        );
        assert_eq!(window.start, date(2024, 1, 2));
        assert_eq!(window.end, Some(date(2024, 1, 5)));
    }

    #[test]
    fn window_unparseable_start_is_today() {
        let today = date(2026, 3, 4);
        let window = DateWindow::from_bounds("soon", Some(""), today);
        assert_eq!(window.start, today);
        assert_eq!(window.end, None);
    }

    #[test]
    fn interval_end_is_exclusive() {
        let interval = SymbolInterval {
            start: date(2024, 1, 2),
            end: date(2024, 1, 3),
            symbol: "X".to_string(),
        };
        assert!(interval.contains(date(2024, 1, 2)));
        assert!(!interval.contains(date(2024, 1, 3)));
        assert!(!interval.contains(date(2024, 1, 1)));
    }

    #[test]
    fn lookup_by_date() {
        let mut cache = ResolutionCache::new();
        cache.insert(mapping(7, date(2024, 1, 2), date(2024, 1, 4), "OLD"));
        cache.insert(mapping(7, date(2024, 1, 4), date(2024, 1, 9), "NEW"));
        assert_eq!(cache.lookup(7, date(2024, 1, 3)), Some("OLD"));
        assert_eq!(cache.lookup(7, date(2024, 1, 5)), Some("NEW"));
        assert_eq!(cache.lookup(7, date(2024, 1, 9)), None);
        assert_eq!(cache.lookup(8, date(2024, 1, 3)), None);
    }

    #[test]
    fn resolved_key_is_never_overwritten() {
        let mut cache = ResolutionCache::new();
        assert!(cache.insert(mapping(7, date(2024, 1, 2), date(2024, 1, 3), "FIRST")));
        assert!(!cache.insert(mapping(7, date(2024, 1, 2), date(2024, 1, 3), "FIRST")));
        cache.insert(mapping(7, date(2024, 1, 2), date(2024, 1, 3), "SECOND"));
        assert_eq!(cache.lookup(7, date(2024, 1, 2)), Some("FIRST"));
        assert_eq!(cache.lookup(7, date(2024, 1, 2)), Some("FIRST"));
    }

    #[test]
    fn empty_symbols_and_intervals_are_ignored() {
        let mut cache = ResolutionCache::new();
        assert!(!cache.insert(mapping(7, date(2024, 1, 2), date(2024, 1, 3), "")));
        assert!(!cache.insert(mapping(7, date(2024, 1, 3), date(2024, 1, 3), "X")));
        assert!(cache.is_empty());
    }

    #[test]
    fn merge_counts_new_mappings() {
        let mut cache = ResolutionCache::new();
        let batch = vec![
            mapping(1, date(2024, 1, 2), date(2024, 1, 3), "A"),
            mapping(2, date(2024, 1, 2), date(2024, 1, 3), "B"),
            mapping(1, date(2024, 1, 2), date(2024, 1, 3), "A"),
        ];
        assert_eq!(cache.merge(batch), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn queue_take_clears_membership() {
        let mut queue = PendingQueue::new();
        queue.push(3);
        queue.push(1);
        assert_eq!(queue.take(), vec![3, 1]);
        assert!(queue.is_empty());
        assert!(!queue.contains(3));
        assert!(queue.push(3));
    }

    proptest! {
        #[test]
        fn queue_holds_each_id_once(ids in proptest::collection::vec(0u32..50, 0..200)) {
            let mut queue = PendingQueue::new();
            for id in &ids {
                queue.push(*id);
                queue.push(*id);
            }
            let distinct: HashSet<_> = ids.iter().copied().collect();
            prop_assert_eq!(queue.len(), distinct.len());

            let drained = queue.take();
            let mut first_seen = Vec::new();
            for id in ids {
                if !first_seen.contains(&id) {
                    first_seen.push(id);
                }
            }
            prop_assert_eq!(drained, first_seen);
        }
    }
}
