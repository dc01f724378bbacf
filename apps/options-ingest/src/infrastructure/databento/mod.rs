//! Databento Historical Adapter
//!
//! HTTP integration with the Databento historical API:
//! - `timeseries.get_range` streamed as JSON lines into a [`RecordSource`]
//! - `symbology.resolve` behind the [`SymbologyPort`]
//!
//! [`RecordSource`]: crate::application::ports::RecordSource
//! [`SymbologyPort`]: crate::application::ports::SymbologyPort

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;
mod source;

pub use adapter::DatabentoSymbologyAdapter;
pub use api_types::{DatabentoTrade, RecordHeader, WireNumber};
pub use config::{DEFAULT_BASE_URL, DatabentoConfig, RangeQuery};
pub use error::DatabentoError;
pub use http_client::DatabentoHttpClient;
pub use source::{JsonLinesSource, RangeSource};
