//! Live Tick Deduplication
//!
//! Live feeds re-notify the same last trade when unrelated ticker fields
//! change. The tracker keeps only the most recently accepted
//! `(ts, price, size)` key: consecutive repeats are suppressed, a repeat
//! separated by a different tick is accepted again.

/// Identity of a live trade notification.
#[derive(Debug, Clone, Copy)]
pub struct DedupKey {
    /// Event time in epoch milliseconds.
    pub ts: i64,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: i64,
}

impl DedupKey {
    /// Build a key, or `None` when price or size is missing.
    #[must_use]
    pub const fn from_parts(ts: i64, price: Option<f64>, size: Option<i64>) -> Option<Self> {
        match (price, size) {
            (Some(price), Some(size)) => Some(Self { ts, price, size }),
            _ => None,
        }
    }
}

// Bitwise price comparison keeps the relation reflexive for NaN.
impl PartialEq for DedupKey {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts
            && self.size == other.size
            && self.price.to_bits() == other.price.to_bits()
    }
}

impl Eq for DedupKey {}

/// Retains the last accepted key.
#[derive(Debug, Default)]
pub struct DedupTracker {
    last: Option<DedupKey>,
}

impl DedupTracker {
    /// Create a tracker with no history.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Accept `key` unless it equals the previous accepted key.
    ///
    /// Returns `true` when the tick should be emitted.
    pub fn accept(&mut self, key: DedupKey) -> bool {
        if self.last == Some(key) {
            return false;
        }
        self.last = Some(key);
        true
    }

    /// The most recently accepted key.
    #[must_use]
    pub const fn last(&self) -> Option<DedupKey> {
        self.last
    }
}
