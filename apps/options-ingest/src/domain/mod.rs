//! Domain Layer - Trade normalization types and pure logic.
//!
//! Nothing here performs I/O. Provider records enter through the
//! [`record::TradeRecord`] capability trait and leave as
//! [`payload::CanonicalPayload`].

/// Listed option contract and OCC symbol formatting.
pub mod contract;

/// Live tick deduplication.
pub mod dedup;

/// Canonical payload and payload builder.
pub mod payload;

/// Provider record capabilities and field precedence.
pub mod record;

/// Instrument identifier queue, date window and resolution cache.
pub mod symbology;

/// Timestamp normalization and date parsing.
pub mod timestamp;
