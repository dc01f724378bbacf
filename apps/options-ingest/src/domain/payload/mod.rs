//! Canonical Trade Payload
//!
//! The single output contract shared by the replay and live pipelines:
//!
//! ```json
//! {"ts": 1704205800000, "price": 1.25, "size": 3, "symbol": "SPY   240119C00470000",
//!  "exchange": "30", "conditions": ["I"]}
//! ```
//!
//! `exchange` and `conditions` are omitted when absent. A payload is only
//! ever built when `ts`, `price`, `size` and `symbol` are all present.

use serde::{Deserialize, Serialize};

use crate::domain::record::{TradeFields, TradeRecord};
use crate::domain::timestamp::normalize_ts;

/// One normalized trade, written as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPayload {
    /// Event time in epoch milliseconds (UTC).
    pub ts: i64,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: i64,
    /// Human-readable trade symbol (or raw identifier fallback).
    pub symbol: String,
    /// Exchange or publisher code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Trade condition codes, in provider order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

/// Why a record did not produce a payload.
///
/// Drops are expected filtering of incomplete ticks, not errors; the reason
/// only feeds logs and the dropped-records counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Timestamp missing or unrepresentable.
    Timestamp,
    /// Price missing.
    Price,
    /// Size missing.
    Size,
    /// No symbol capability present and no override given.
    Symbol,
    /// Live tick identical to the previous accepted tick.
    Duplicate,
}

impl DropReason {
    /// Label used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Price => "price",
            Self::Size => "size",
            Self::Symbol => "symbol",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Build a payload from already-probed fields.
///
/// A non-empty `symbol_override` wins over the record's own symbol fields.
///
/// # Errors
///
/// Returns the [`DropReason`] for the first missing required field.
pub fn build_payload(
    fields: &TradeFields,
    symbol_override: Option<&str>,
) -> Result<CanonicalPayload, DropReason> {
    let ts = normalize_ts(&fields.ts_event).ok_or(DropReason::Timestamp)?;
    let price = fields.price.ok_or(DropReason::Price)?;
    let size = fields.size.ok_or(DropReason::Size)?;

    let symbol = match symbol_override.filter(|s| !s.is_empty()) {
        Some(symbol) => symbol.to_string(),
        None => fields
            .symbol
            .as_ref()
            .map(crate::domain::record::SymbolValue::render)
            .ok_or(DropReason::Symbol)?,
    };

    Ok(CanonicalPayload {
        ts,
        price,
        size,
        symbol,
        exchange: fields.exchange.clone(),
        conditions: fields.conditions.clone(),
    })
}

/// Probe a record and build its payload in one step.
///
/// # Errors
///
/// Returns the [`DropReason`] for the first missing required field.
pub fn payload_from_record<R: TradeRecord + ?Sized>(
    record: &R,
    symbol_override: Option<&str>,
) -> Result<CanonicalPayload, DropReason> {
    build_payload(&TradeFields::probe(record), symbol_override)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::SymbolValue;
    use crate::domain::timestamp::TimeValue;

    fn fields() -> TradeFields {
        TradeFields {
            ts_event: TimeValue::Integer(1_704_205_800_000_000_000),
            price: Some(1.25),
            size: Some(3),
            symbol: Some(SymbolValue::Id(42)),
            exchange: None,
            conditions: Vec::new(),
        }
    }

    #[test]
    fn builds_with_record_symbol() {
        let payload = build_payload(&fields(), None).unwrap();
        assert_eq!(payload.ts, 1_704_205_800_000);
        assert_eq!(payload.symbol, "42");
        assert_eq!(payload.size, 3);
    }

    #[test]
    fn override_wins() {
        let payload = build_payload(&fields(), Some("SPY   240119C00470000")).unwrap();
        assert_eq!(payload.symbol, "SPY   240119C00470000");
    }

    #[test]
    fn empty_override_falls_back() {
        let payload = build_payload(&fields(), Some("")).unwrap();
        assert_eq!(payload.symbol, "42");
    }

    #[test]
    fn missing_price_is_dropped() {
        let mut f = fields();
        f.price = None;
        assert_eq!(build_payload(&f, Some("X")), Err(DropReason::Price));
    }

    #[test]
    fn missing_size_is_dropped() {
        let mut f = fields();
        f.size = None;
        assert_eq!(build_payload(&f, None), Err(DropReason::Size));
    }

    #[test]
    fn missing_symbol_is_dropped() {
        let mut f = fields();
        f.symbol = None;
        assert_eq!(build_payload(&f, None), Err(DropReason::Symbol));
    }

    #[test]
    fn unrepresentable_ts_is_dropped() {
        let mut f = fields();
        f.ts_event = TimeValue::Text("not a time".to_string());
        assert_eq!(build_payload(&f, None), Err(DropReason::Timestamp));
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_string(&build_payload(&fields(), None).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"ts":1704205800000,"price":1.25,"size":3,"symbol":"42"}"#
        );
    }

    #[test]
    fn optional_fields_are_written_when_present() {
        let mut f = fields();
        f.exchange = Some("30".to_string());
        f.conditions = vec!["I".to_string(), "S".to_string()];
        let json = serde_json::to_string(&build_payload(&f, None).unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"ts":1704205800000,"price":1.25,"size":3,"symbol":"42","exchange":"30","conditions":["I","S"]}"#
        );
    }
}
