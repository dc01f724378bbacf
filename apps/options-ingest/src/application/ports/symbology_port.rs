//! Symbology Port (Driven Port)
//!
//! Interface to the external lookup service that maps numeric instrument
//! identifiers to raw trade symbols over a date window.

use async_trait::async_trait;

use crate::domain::symbology::{DateWindow, InstrumentId, SymbolMapping};

/// Input symbology type for identifier lookups.
pub const STYPE_INSTRUMENT_ID: &str = "instrument_id";

/// Output symbology type for identifier lookups.
pub const STYPE_RAW_SYMBOL: &str = "raw_symbol";

/// A single lookup call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Dataset the identifiers belong to.
    pub dataset: String,
    /// Identifiers to resolve, in queue order.
    pub instrument_ids: Vec<InstrumentId>,
    /// Input symbology kind.
    pub stype_in: &'static str,
    /// Output symbology kind.
    pub stype_out: &'static str,
    /// Date window the lookup is scoped to.
    pub window: DateWindow,
}

impl ResolveRequest {
    /// Build an `instrument_id -> raw_symbol` request.
    #[must_use]
    pub fn instrument_ids(
        dataset: impl Into<String>,
        instrument_ids: Vec<InstrumentId>,
        window: DateWindow,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            instrument_ids,
            stype_in: STYPE_INSTRUMENT_ID,
            stype_out: STYPE_RAW_SYMBOL,
            window,
        }
    }
}

/// Symbology lookup error.
#[derive(Debug, thiserror::Error)]
pub enum SymbologyError {
    /// Request could not be sent or the body could not be read.
    #[error("symbology transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// The service answered with a non-success status.
    #[error("symbology request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid symbology response: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },
}

/// Port for resolving instrument identifiers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SymbologyPort: Send + Sync {
    /// Resolve one batch of identifiers.
    ///
    /// Identifiers the service does not know are simply absent from the
    /// returned mappings.
    async fn resolve(&self, request: &ResolveRequest)
    -> Result<Vec<SymbolMapping>, SymbologyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn instrument_id_request_kinds() {
        let window = DateWindow {
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            end: None,
        };
        let request = ResolveRequest::instrument_ids("OPRA.PILLAR", vec![1, 2], window);
        assert_eq!(request.stype_in, "instrument_id");
        assert_eq!(request.stype_out, "raw_symbol");
        assert_eq!(request.instrument_ids, vec![1, 2]);
    }
}
