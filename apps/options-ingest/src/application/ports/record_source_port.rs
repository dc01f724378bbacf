//! Record Source Port (Driven Port)
//!
//! Pull contract for the replay pipeline: the pipeline asks for the next
//! record until the source reports end-of-stream.

use async_trait::async_trait;

use crate::domain::record::TradeRecord;

/// Replay source error.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The byte stream failed mid-replay.
    #[error("record stream error: {0}")]
    Stream(#[from] std::io::Error),

    /// A line could not be decoded as a record.
    #[error("malformed record: {message}")]
    Malformed {
        /// Error details.
        message: String,
    },
}

/// A finite, in-order sequence of provider records.
#[async_trait]
pub trait RecordSource: Send {
    /// Record type produced by this source.
    type Record: TradeRecord + Send;

    /// Fetch the next record, or `None` at end-of-stream.
    async fn next_record(&mut self) -> Result<Option<Self::Record>, SourceError>;
}
