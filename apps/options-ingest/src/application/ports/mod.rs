//! Application Ports (Driver and Driven)
//!
//! Ports define the contracts the pipelines consume. Infrastructure
//! adapters implement them; tests substitute in-memory fakes.
//!
//! - `SymbologyPort`: batched, date-scoped identifier lookup
//! - `RecordSource`: pull-iteration over a finite replay
//! - `LiveFeed` / `TickHandler`: push-callback live stream
//! - `PayloadSink`: line-oriented payload output

mod live_feed_port;
mod payload_sink_port;
mod record_source_port;
mod symbology_port;

pub use live_feed_port::{LiveFeed, LiveFeedError, LiveTick, QualifiedContract, TickHandler};
pub use payload_sink_port::{EmitError, PayloadSink};
pub use record_source_port::{RecordSource, SourceError};
pub use symbology_port::{ResolveRequest, SymbologyError, SymbologyPort};

#[cfg(test)]
pub use symbology_port::MockSymbologyPort;
