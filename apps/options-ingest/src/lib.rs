#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Options Ingest - Trade Tick Normalizer
//!
//! Turns option trades from two providers into one canonical JSON object
//! per line on stdout: a finite historical replay from Databento and a
//! long-running live stream for a single contract from Alpaca OPRA.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Pure normalization logic
//!   - `timestamp`: epoch unit detection and date parsing
//!   - `record`: provider record capabilities and field precedence
//!   - `payload`: canonical payload and builder
//!   - `symbology`: identifier queue, date window, resolution cache
//!   - `dedup`: live duplicate suppression
//!   - `contract`: option contract and OCC symbol
//!
//! - **Application**: Pipelines and port definitions
//!   - `ports`: lookup service, record source, live feed, payload sink
//!   - `services`: symbol resolver, replay coordinator, live tick handler
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `databento`: historical range stream and symbology lookup
//!   - `alpaca`: OPRA WebSocket live feed
//!   - `emitter`: JSON-lines writer
//!   - `config`: CLI and settings
//!   - `telemetry`, `metrics`: observability
//!
//! # Data Flow
//!
//! ```text
//! Databento range ──► ReplayCoordinator ──┐
//!                        │  ▲             │
//!                        ▼  │             ├──► JsonLinesEmitter ──► stdout
//!                  SymbolResolver         │
//!                                         │
//! Alpaca OPRA WS ──► LiveTickHandler ─────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Normalization types with no I/O.
pub mod domain;

/// Application layer - Pipelines and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::contract::{ContractError, OptionContract, OptionRight};
pub use domain::payload::{CanonicalPayload, DropReason};
pub use domain::symbology::{DateWindow, InstrumentId, SymbolMapping};
pub use domain::timestamp::TimeValue;

// Ports and pipelines
pub use application::ports::{
    EmitError, LiveFeed, LiveFeedError, LiveTick, PayloadSink, QualifiedContract, RecordSource,
    ResolveRequest, SourceError, SymbologyError, SymbologyPort, TickHandler,
};
pub use application::services::{
    BufferSettings, LiveStats, LiveTickHandler, ReplayCoordinator, ReplayError, ReplayStats,
    SymbolResolver,
};

// Infrastructure config
pub use infrastructure::config::{
    Cli, Command, ConfigError, MetricsSettings, ReplaySettings, StreamSettings,
};

// Adapters
pub use infrastructure::alpaca::{OpraFeedConfig, OpraLiveFeed, OptionsFeed};
pub use infrastructure::databento::{
    DatabentoConfig, DatabentoHttpClient, DatabentoSymbologyAdapter, RangeQuery,
};
pub use infrastructure::emitter::JsonLinesEmitter;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
