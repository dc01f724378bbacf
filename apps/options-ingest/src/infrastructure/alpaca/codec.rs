//! Stream Codec Module
//!
//! `MessagePack` encoding and decoding for the OPRA options stream.
//!
//! Frames arrive as arrays where each element is a map carrying a `T`
//! discriminator:
//!
//! ```json
//! [{"T":"t","S":"AAPL240315C00172500","t":<ext -1>,"p":2.84,"s":1,"x":"N","c":"S"}]
//! ```
//!
//! Control messages are plain string-keyed maps and deserialize directly.
//! Trades are read field by field from the dynamic [`rmpv::Value`] because
//! the timestamp uses the `MessagePack` timestamp extension (type -1).

use chrono::{DateTime, Utc};
use rmpv::Value;

use crate::infrastructure::alpaca::messages::{
    AlpacaMessage, ErrorMessage, OptionTradeMessage, SubscriptionMessage, SuccessMessage,
};

/// `MessagePack` timestamp extension type.
const TIMESTAMP_EXT: i8 = -1;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// `MessagePack` encoding failed.
    #[error("`MessagePack` encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// Frame is not valid `MessagePack`.
    #[error("`MessagePack` decode error: {0}")]
    MsgPackDecode(#[from] rmpv::decode::Error),

    /// A control message did not match its schema.
    #[error("invalid {msg_type} message: {message}")]
    InvalidMessage {
        /// Message type being decoded.
        msg_type: String,
        /// Error details.
        message: String,
    },

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// `MessagePack` codec for the OPRA options stream.
#[derive(Debug, Default, Clone)]
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Create a new `MessagePack` codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one binary frame into stream messages.
    ///
    /// A bare map is treated as a one-element array.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not `MessagePack`, is not an array
    /// of maps, or a control message does not match its schema.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<AlpacaMessage>, CodecError> {
        let mut cursor = std::io::Cursor::new(data);
        let value = rmpv::decode::read_value(&mut cursor)?;

        let items = match value {
            Value::Array(items) => items,
            map @ Value::Map(_) => vec![map],
            other => {
                return Err(CodecError::InvalidFormat(format!(
                    "expected array or map, got {other}"
                )));
            }
        };

        items.into_iter().map(decode_message).collect()
    }

    /// Encode a value to `MessagePack` bytes with named fields (map format).
    ///
    /// # Errors
    ///
    /// Returns an error if `MessagePack` serialization fails.
    pub fn encode_named<T: serde::Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(value)?)
    }
}

fn decode_message(value: Value) -> Result<AlpacaMessage, CodecError> {
    let msg_type = field(&value, "T")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::InvalidFormat("message without T field".to_string()))?
        .to_string();

    match msg_type.as_str() {
        "success" => control::<SuccessMessage>(value, &msg_type).map(AlpacaMessage::Success),
        "error" => control::<ErrorMessage>(value, &msg_type).map(AlpacaMessage::Error),
        "subscription" => control::<SubscriptionMessage>(value, &msg_type).map(AlpacaMessage::Subscription),
        "t" => decode_trade(&value).map(AlpacaMessage::OptionTrade),
        _ => Ok(AlpacaMessage::Other(msg_type)),
    }
}

fn control<T: serde::de::DeserializeOwned>(value: Value, msg_type: &str) -> Result<T, CodecError> {
    rmpv::ext::from_value(value).map_err(|e| CodecError::InvalidMessage {
        msg_type: msg_type.to_string(),
        message: e.to_string(),
    })
}

fn decode_trade(value: &Value) -> Result<OptionTradeMessage, CodecError> {
    let symbol = field(value, "S")
        .and_then(Value::as_str)
        .ok_or_else(|| CodecError::InvalidMessage {
            msg_type: "t".to_string(),
            message: "missing symbol".to_string(),
        })?
        .to_string();

    Ok(OptionTradeMessage {
        symbol,
        timestamp: field(value, "t").and_then(decode_timestamp),
        price: field(value, "p").and_then(decode_number),
        size: field(value, "s").and_then(Value::as_i64),
        exchange: field(value, "x")
            .and_then(Value::as_str)
            .filter(|x| !x.is_empty())
            .map(str::to_string),
        conditions: field(value, "c").map(decode_conditions).unwrap_or_default(),
    })
}

fn field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

#[allow(clippy::cast_precision_loss)]
fn decode_number(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|n| n as f64))
}

fn decode_conditions(value: &Value) -> Vec<String> {
    match value {
        Value::String(code) => code.as_str().map(str::to_string).into_iter().collect(),
        Value::Array(codes) => codes
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode a timestamp extension or an RFC 3339 string.
fn decode_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Ext(TIMESTAMP_EXT, data) => decode_timestamp_ext(data),
        Value::String(text) => DateTime::parse_from_rfc3339(text.as_str()?)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Timestamp extension payloads: 32-bit seconds, 64-bit packed
/// nanoseconds (30 bits) and seconds (34 bits), or 96-bit nanoseconds
/// plus signed seconds.
fn decode_timestamp_ext(data: &[u8]) -> Option<DateTime<Utc>> {
    match data.len() {
        4 => {
            let secs = u32::from_be_bytes(data.try_into().ok()?);
            DateTime::from_timestamp(i64::from(secs), 0)
        }
        8 => {
            let packed = u64::from_be_bytes(data.try_into().ok()?);
            let nanos = u32::try_from(packed >> 34).ok()?;
            let secs = i64::try_from(packed & 0x0000_0003_ffff_ffff).ok()?;
            DateTime::from_timestamp(secs, nanos)
        }
        12 => {
            let nanos = u32::from_be_bytes(data[..4].try_into().ok()?);
            let secs = i64::from_be_bytes(data[4..].try_into().ok()?);
            DateTime::from_timestamp(secs, nanos)
        }
        _ => None,
    }
}
