//! Payload Sink Port (Driven Port)

use crate::domain::payload::CanonicalPayload;

/// Payload output error. Always fatal to the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Writing or flushing the output failed.
    #[error("failed to write payload: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be serialized.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for canonical payloads.
pub trait PayloadSink {
    /// Write one payload. Must not return before the payload is flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn emit(&mut self, payload: &CanonicalPayload) -> Result<(), EmitError>;
}

impl PayloadSink for Vec<CanonicalPayload> {
    fn emit(&mut self, payload: &CanonicalPayload) -> Result<(), EmitError> {
        self.push(payload.clone());
        Ok(())
    }
}

impl<S: PayloadSink + ?Sized> PayloadSink for &mut S {
    fn emit(&mut self, payload: &CanonicalPayload) -> Result<(), EmitError> {
        (**self).emit(payload)
    }
}
