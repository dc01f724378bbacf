//! Application Layer - Pipelines and port definitions.
//!
//! This layer wires the pure domain logic to the outside world through
//! the port traits, without knowing which provider sits behind them.

/// Port interfaces for external systems (lookup service, feeds, output).
pub mod ports;

/// Replay and live pipelines.
pub mod services;
