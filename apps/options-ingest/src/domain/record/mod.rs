//! Provider Record Capabilities
//!
//! Providers deliver trade records of different shapes: some carry a ready
//! `symbol`, some only a numeric `instrument_id`, some name the venue
//! `exchange` and others `publisher_id`. Each provider record type
//! implements [`TradeRecord`], answering only the capabilities it has; the
//! rest default to "absent".
//!
//! [`TradeFields::probe`] walks the capabilities once per record in a fixed
//! precedence order and produces an owned snapshot that the rest of the
//! pipeline works from.

use crate::domain::symbology::InstrumentId;
use crate::domain::timestamp::TimeValue;

// =============================================================================
// Field Values
// =============================================================================

/// A symbol-like field, which may be textual or a numeric identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolValue {
    /// Human-readable symbol text (may still be all digits).
    Text(String),
    /// Provider-internal numeric identifier.
    Id(InstrumentId),
}

impl SymbolValue {
    /// The numeric instrument identifier, if this value is one.
    ///
    /// Text made only of ASCII digits counts as numeric. Digit text too
    /// large for an [`InstrumentId`] cannot name a provider instrument and
    /// stays textual; see [`is_oversized_id`](Self::is_oversized_id).
    #[must_use]
    pub fn as_instrument_id(&self) -> Option<InstrumentId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Text(text) if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) => {
                text.parse().ok()
            }
            Self::Text(_) => None,
        }
    }

    /// Whether this is digit text that overflows an [`InstrumentId`].
    #[must_use]
    pub fn is_oversized_id(&self) -> bool {
        matches!(self, Self::Text(text) if !text.is_empty()
            && text.bytes().all(|b| b.is_ascii_digit())
            && text.parse::<InstrumentId>().is_err())
    }

    /// Render as the string written to the payload.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Id(id) => id.to_string(),
        }
    }

    fn is_present(&self) -> bool {
        !matches!(self, Self::Text(text) if text.is_empty())
    }
}

/// Trade condition codes, either a single code or a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditions {
    /// A bare condition code.
    One(String),
    /// An ordered list of codes.
    Many(Vec<String>),
}

impl Conditions {
    /// Flatten into an ordered list, dropping empty codes.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(code) if code.is_empty() => Vec::new(),
            Self::One(code) => vec![code],
            Self::Many(codes) => codes.into_iter().filter(|c| !c.is_empty()).collect(),
        }
    }

    fn is_present(&self) -> bool {
        match self {
            Self::One(code) => !code.is_empty(),
            Self::Many(codes) => codes.iter().any(|c| !c.is_empty()),
        }
    }
}

// =============================================================================
// Capability Trait
// =============================================================================

/// Read-only view over a provider trade record.
///
/// Only `ts_event`, `price` and `size` are required of every provider;
/// the remaining accessors describe optional capabilities.
pub trait TradeRecord {
    /// Event time in whatever encoding the provider uses.
    fn ts_event(&self) -> TimeValue;

    /// Trade price.
    fn price(&self) -> Option<f64>;

    /// Trade size.
    fn size(&self) -> Option<i64>;

    /// Symbol as delivered by the provider.
    fn symbol(&self) -> Option<SymbolValue> {
        None
    }

    /// Venue-native raw symbol.
    fn raw_symbol(&self) -> Option<SymbolValue> {
        None
    }

    /// Numeric instrument identifier.
    fn instrument_id(&self) -> Option<InstrumentId> {
        None
    }

    /// Exchange code.
    fn exchange(&self) -> Option<String> {
        None
    }

    /// Publisher (venue/feed) identifier.
    fn publisher_id(&self) -> Option<String> {
        None
    }

    /// Alternate exchange identifier.
    fn exchange_id(&self) -> Option<String> {
        None
    }

    /// Condition code list.
    fn conditions(&self) -> Option<Conditions> {
        None
    }

    /// Single condition code.
    fn condition(&self) -> Option<Conditions> {
        None
    }
}

// =============================================================================
// Probed Snapshot
// =============================================================================

/// Owned snapshot of a record after capability probing.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeFields {
    /// Event time, still un-normalized.
    pub ts_event: TimeValue,
    /// Trade price.
    pub price: Option<f64>,
    /// Trade size.
    pub size: Option<i64>,
    /// First present of `symbol`, `raw_symbol`, `instrument_id`.
    pub symbol: Option<SymbolValue>,
    /// First present of `exchange`, `publisher_id`, `exchange_id`.
    pub exchange: Option<String>,
    /// First present of `conditions`, `condition`, flattened.
    pub conditions: Vec<String>,
}

impl TradeFields {
    /// Probe a record's capabilities in precedence order.
    pub fn probe<R: TradeRecord + ?Sized>(record: &R) -> Self {
        let symbol = record
            .symbol()
            .filter(SymbolValue::is_present)
            .or_else(|| record.raw_symbol().filter(SymbolValue::is_present))
            .or_else(|| record.instrument_id().map(SymbolValue::Id));

        let exchange = [record.exchange(), record.publisher_id(), record.exchange_id()]
            .into_iter()
            .flatten()
            .find(|e| !e.is_empty());

        let conditions = record
            .conditions()
            .filter(Conditions::is_present)
            .or_else(|| record.condition().filter(Conditions::is_present))
            .map(Conditions::into_vec)
            .unwrap_or_default();

        Self {
            ts_event: record.ts_event(),
            price: record.price(),
            size: record.size(),
            symbol,
            exchange,
            conditions,
        }
    }

    /// Numeric instrument identifier carried in the symbol slot, if any.
    #[must_use]
    pub fn numeric_symbol(&self) -> Option<InstrumentId> {
        self.symbol.as_ref().and_then(SymbolValue::as_instrument_id)
    }
}
