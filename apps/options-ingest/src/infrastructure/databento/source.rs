//! Line-delimited JSON record source.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;

use super::api_types::DatabentoTrade;
use crate::application::ports::{RecordSource, SourceError};

/// Source over a streaming range response body.
pub type RangeSource = JsonLinesSource<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Reads one [`DatabentoTrade`] per line.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    buf: Vec<u8>,
    line: u64,
}

impl<R> JsonLinesSource<R> {
    /// Wrap a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }

    /// Lines consumed so far, including blank ones.
    #[must_use]
    pub const fn lines_read(&self) -> u64 {
        self.line
    }
}

impl RangeSource {
    /// Stream an HTTP response body.
    #[must_use]
    pub fn from_response(response: reqwest::Response) -> Self {
        let stream = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        Self::new(Box::new(StreamReader::new(stream)))
    }
}

#[async_trait]
impl<R> RecordSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    type Record = DatabentoTrade;

    async fn next_record(&mut self) -> Result<Option<DatabentoTrade>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = String::from_utf8_lossy(&self.buf);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|e| SourceError::Malformed {
                    message: format!("line {}: {e}", self.line),
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{SymbolValue, TradeRecord};

    #[tokio::test]
    async fn skips_blank_lines() {
        let input: &[u8] = b"\n{\"hd\":{\"ts_event\":\"1\",\"instrument_id\":5},\"price\":\"1\",\"size\":1}\n\n";
        let mut source = JsonLinesSource::new(input);

        let record = source.next_record().await.unwrap().unwrap();
        assert_eq!(record.instrument_id(), Some(5));
        assert!(source.next_record().await.unwrap().is_none());
        assert_eq!(source.lines_read(), 3);
    }

    #[tokio::test]
    async fn last_line_without_newline() {
        let input: &[u8] = b"{\"hd\":{\"ts_event\":\"1\",\"instrument_id\":5},\"size\":1}";
        let mut source = JsonLinesSource::new(input);
        assert!(source.next_record().await.unwrap().is_some());
        assert!(source.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let input: &[u8] =
            b"{\"hd\":{\"ts_event\":\"1\",\"instrument_id\":5},\"size\":1,\"symbol\":\"SP\xffY\"}\n";
        let mut source = JsonLinesSource::new(input);
        let record = source.next_record().await.unwrap().unwrap();
        assert_eq!(
            record.symbol(),
            Some(SymbolValue::Text("SP\u{fffd}Y".to_string()))
        );
    }

    #[tokio::test]
    async fn malformed_line_reports_position() {
        let input: &[u8] = b"\nnot json\n";
        let mut source = JsonLinesSource::new(input);
        let err = source.next_record().await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed { message } if message.starts_with("line 2")));
    }
}
