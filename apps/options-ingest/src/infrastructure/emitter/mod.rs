//! JSON Lines Emitter
//!
//! Writes each payload as one JSON object followed by `\n`, flushing after
//! every line so a line-oriented consumer never waits on buffered output.

use std::io::Write;

use crate::application::ports::{EmitError, PayloadSink};
use crate::domain::payload::CanonicalPayload;

/// Payload sink over any writer.
#[derive(Debug)]
pub struct JsonLinesEmitter<W> {
    writer: W,
    lines: u64,
}

impl JsonLinesEmitter<std::io::Stdout> {
    /// Emitter on standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesEmitter<W> {
    /// Wrap `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Lines written so far.
    #[must_use]
    pub const fn lines(&self) -> u64 {
        self.lines
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PayloadSink for JsonLinesEmitter<W> {
    fn emit(&mut self, payload: &CanonicalPayload) -> Result<(), EmitError> {
        let mut line = serde_json::to_vec(payload)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        self.lines += 1;
        Ok(())
    }
}
