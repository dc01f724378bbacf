//! Prometheus Metrics Module
//!
//! Pipeline counters recorded through the `metrics` facade. Without an
//! installed recorder every call is a no-op, so the pipelines record
//! unconditionally.
//!
//! # Metrics
//!
//! - `options_ingest_records_received_total{pipeline}`
//! - `options_ingest_payloads_emitted_total{pipeline}`
//! - `options_ingest_records_dropped_total{pipeline,reason}`
//! - `options_ingest_resolution_batches_total`
//! - `options_ingest_resolution_batch_size` (histogram)
//! - `options_ingest_symbols_resolved_total`
//! - `options_ingest_fallback_symbols_total`
//! - `options_ingest_buffered_records` (gauge)
//!
//! # Integration
//!
//! With a non-zero `INGEST_METRICS_PORT`, [`init_metrics`] starts the
//! Prometheus HTTP listener on that port.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::domain::payload::DropReason;

// =============================================================================
// Initialization
// =============================================================================

static INSTALLED: OnceLock<u16> = OnceLock::new();

/// Install the Prometheus exporter with an HTTP listener on `port`.
///
/// Returns `Ok(false)` without installing anything when `port` is 0 or an
/// exporter is already installed.
///
/// # Errors
///
/// Returns an error if the listener or recorder cannot be installed.
pub fn init_metrics(port: u16) -> Result<bool, BuildError> {
    if port == 0 || INSTALLED.get().is_some() {
        return Ok(false);
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        .install()?;

    let _ = INSTALLED.set(port);
    register_metrics();
    tracing::info!(port, "Prometheus exporter listening");
    Ok(true)
}

fn register_metrics() {
    describe_counter!(
        "options_ingest_records_received_total",
        "Total records received from a source"
    );
    describe_counter!(
        "options_ingest_payloads_emitted_total",
        "Total canonical payloads written"
    );
    describe_counter!(
        "options_ingest_records_dropped_total",
        "Total records dropped by reason"
    );
    describe_counter!(
        "options_ingest_resolution_batches_total",
        "Total symbology lookup requests"
    );
    describe_histogram!(
        "options_ingest_resolution_batch_size",
        "Identifiers per symbology lookup request"
    );
    describe_counter!(
        "options_ingest_symbols_resolved_total",
        "Total new symbol mappings cached"
    );
    describe_counter!(
        "options_ingest_fallback_symbols_total",
        "Total payloads emitted with a raw identifier as the symbol"
    );
    describe_gauge!(
        "options_ingest_buffered_records",
        "Replay records awaiting symbol resolution"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric label for the pipeline a record flows through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Historical replay.
    Replay,
    /// Live stream.
    Live,
}

impl Pipeline {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::Live => "live",
        }
    }
}

/// Record a record received from a source.
pub fn record_received(pipeline: Pipeline) {
    counter!(
        "options_ingest_records_received_total",
        "pipeline" => pipeline.as_str()
    )
    .increment(1);
}

/// Record a payload written.
pub fn record_emitted(pipeline: Pipeline) {
    counter!(
        "options_ingest_payloads_emitted_total",
        "pipeline" => pipeline.as_str()
    )
    .increment(1);
}

/// Record a silently dropped record.
pub fn record_dropped(pipeline: Pipeline, reason: DropReason) {
    counter!(
        "options_ingest_records_dropped_total",
        "pipeline" => pipeline.as_str(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record one lookup request of `size` identifiers.
#[allow(clippy::cast_precision_loss)]
pub fn record_resolution_batch(size: usize) {
    counter!("options_ingest_resolution_batches_total").increment(1);
    histogram!("options_ingest_resolution_batch_size").record(size as f64);
}

/// Record newly cached symbol mappings.
pub fn record_symbols_resolved(count: usize) {
    counter!("options_ingest_symbols_resolved_total").increment(count as u64);
}

/// Record a payload emitted with a raw identifier fallback.
pub fn record_fallback_symbol() {
    counter!("options_ingest_fallback_symbols_total").increment(1);
}

/// Update the replay buffer gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_buffered_records(count: usize) {
    gauge!("options_ingest_buffered_records").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================
