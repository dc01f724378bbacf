//! Databento API request/response types.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;

use crate::domain::record::{SymbolValue, TradeRecord};
use crate::domain::symbology::{InstrumentId, SymbolInterval, SymbolMapping};
use crate::domain::timestamp::{TimeValue, parse_date};

/// Sentinel for an undefined fixed-point price.
const UNDEF_PRICE: i64 = i64::MAX;

/// Fixed-point price scale (1e-9 units).
const FIXED_PRICE_SCALE: u32 = 9;

// =============================================================================
// Range Records
// =============================================================================

/// A numeric field as it appears in JSON output.
///
/// Depending on the `pretty_*` flags a value arrives as a number or a
/// string, and 64-bit timestamps are always quoted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    /// JSON integer.
    Int(i64),
    /// JSON float.
    Float(f64),
    /// Quoted number.
    Text(String),
}

impl WireNumber {
    fn as_time(&self) -> TimeValue {
        match self {
            Self::Int(raw) => TimeValue::Integer(*raw),
            Self::Float(raw) => TimeValue::Float(*raw),
            Self::Text(text) => TimeValue::Text(text.clone()),
        }
    }

    fn as_price(&self) -> Option<f64> {
        match self {
            Self::Int(UNDEF_PRICE) => None,
            Self::Int(raw) => Decimal::new(*raw, FIXED_PRICE_SCALE).to_f64(),
            Self::Float(price) => Some(*price),
            Self::Text(text) => text.trim().parse::<Decimal>().ok()?.to_f64(),
        }
    }
}

/// Common record header.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordHeader {
    /// Matching-engine event time, nanoseconds since the epoch.
    pub ts_event: WireNumber,
    /// Record type.
    #[serde(default)]
    pub rtype: u8,
    /// Publisher (dataset and venue) identifier.
    pub publisher_id: Option<u16>,
    /// Numeric instrument identifier.
    pub instrument_id: Option<InstrumentId>,
}

/// One trade record from a `trades` range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabentoTrade {
    /// Record header.
    pub hd: RecordHeader,
    /// Trade price, fixed-point or pretty-printed.
    #[serde(default)]
    pub price: Option<WireNumber>,
    /// Trade size.
    #[serde(default)]
    pub size: Option<i64>,
    /// Mapped symbol, present only when the server maps symbols.
    #[serde(default)]
    pub symbol: Option<String>,
}

impl TradeRecord for DatabentoTrade {
    fn ts_event(&self) -> TimeValue {
        self.hd.ts_event.as_time()
    }

    fn price(&self) -> Option<f64> {
        self.price.as_ref().and_then(WireNumber::as_price)
    }

    fn size(&self) -> Option<i64> {
        self.size
    }

    fn symbol(&self) -> Option<SymbolValue> {
        self.symbol.clone().map(SymbolValue::Text)
    }

    fn instrument_id(&self) -> Option<InstrumentId> {
        self.hd.instrument_id
    }

    fn publisher_id(&self) -> Option<String> {
        self.hd.publisher_id.map(|id| id.to_string())
    }
}

// =============================================================================
// Symbology
// =============================================================================

/// `symbology.resolve` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbologyResolveResponse {
    /// Intervals keyed by input symbol.
    pub result: HashMap<String, Vec<MappingInterval>>,
    /// Inputs with mappings for only part of the window.
    #[serde(default)]
    pub partial: Vec<String>,
    /// Inputs with no mapping.
    #[serde(default)]
    pub not_found: Vec<String>,
}

/// One mapping interval, `d1` exclusive.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingInterval {
    /// First date.
    pub d0: String,
    /// End date, exclusive.
    pub d1: String,
    /// Output symbol.
    pub s: String,
}

impl SymbologyResolveResponse {
    /// Flatten into domain mappings.
    ///
    /// Keys that are not instrument identifiers and intervals with
    /// unparseable dates are skipped.
    #[must_use]
    pub fn into_mappings(self) -> Vec<SymbolMapping> {
        let mut mappings = Vec::new();
        for (key, intervals) in self.result {
            let Ok(instrument_id) = key.trim().parse::<InstrumentId>() else {
                tracing::debug!(key = %key, "Skipping non-numeric symbology key");
                continue;
            };
            for interval in intervals {
                let (Some(start), Some(end)) = (parse_date(&interval.d0), parse_date(&interval.d1))
                else {
                    tracing::debug!(
                        instrument_id,
                        d0 = %interval.d0,
                        d1 = %interval.d1,
                        "Skipping interval with invalid dates"
                    );
                    continue;
                };
                mappings.push(SymbolMapping {
                    instrument_id,
                    interval: SymbolInterval {
                        start,
                        end,
                        symbol: interval.s,
                    },
                });
            }
        }
        mappings
    }
}

/// Error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error detail, a string or a structured object.
    pub detail: serde_json::Value,
}

impl ApiErrorResponse {
    /// Human-readable detail.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
