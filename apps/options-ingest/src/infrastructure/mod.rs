//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Alpaca OPRA WebSocket live feed.
pub mod alpaca;

/// Command-line parsing and validated settings.
pub mod config;

/// Databento historical HTTP adapter.
pub mod databento;

/// JSON-lines payload output.
pub mod emitter;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
