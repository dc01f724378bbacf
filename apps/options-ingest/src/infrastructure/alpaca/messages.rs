//! Alpaca Options Stream Message Types
//!
//! Wire types for the OPRA options WebSocket. Every frame is a
//! `MessagePack` array of maps discriminated by a `T` field.
//!
//! # Message Types
//!
//! ## Control
//! - `success`: connection or authentication acknowledgment
//! - `error`: error with code and message
//! - `subscription`: the active subscription set
//!
//! ## Market Data
//! - `t`: option trade
//! - `q`: option quote (ignored)
//!
//! # References
//!
//! - [Option Streaming](https://docs.alpaca.markets/docs/real-time-option-data)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::ports::LiveTick;

// =============================================================================
// Control Messages
// =============================================================================

/// Success message indicating connection or authentication succeeded.
///
/// # Wire Format (shown as JSON)
/// ```json
/// {"T": "success", "msg": "connected"}
/// {"T": "success", "msg": "authenticated"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    /// Message type (always "success")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Success message: "connected" or "authenticated"
    pub msg: SuccessKind,
}

/// Kind of success message.
///
/// Read from the plain `msg` string so any self-describing decoder can
/// produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SuccessKind {
    /// Initial connection established
    Connected,
    /// Authentication successful
    Authenticated,
}

impl TryFrom<String> for SuccessKind {
    type Error = String;

    fn try_from(msg: String) -> Result<Self, Self::Error> {
        match msg.as_str() {
            "connected" => Ok(Self::Connected),
            "authenticated" => Ok(Self::Authenticated),
            other => Err(format!("unknown success message: {other}")),
        }
    }
}

/// Error message with code and description.
///
/// # Error Codes
/// - 400: Invalid syntax
/// - 401: Not authenticated
/// - 402: Auth failed
/// - 403: Already authenticated
/// - 404: Auth timeout
/// - 405: Symbol limit exceeded
/// - 406: Connection limit exceeded
/// - 407: Slow client
/// - 408: Insufficient subscription
/// - 412: Option messages are only available in `MessagePack` format
/// - 500: Internal error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Message type (always "error")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Error code
    pub code: i32,

    /// Error message
    pub msg: String,
}

/// Subscription confirmation listing every active channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMessage {
    /// Message type (always "subscription")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Subscribed trade symbols
    #[serde(default)]
    pub trades: Vec<String>,

    /// Subscribed quote symbols
    #[serde(default)]
    pub quotes: Vec<String>,
}

// =============================================================================
// Market Data
// =============================================================================

/// Option trade.
///
/// Decoded field by field because `t` arrives as a `MessagePack`
/// timestamp extension and `c` as either a code or a list of codes.
///
/// # Wire Format (shown as JSON)
/// ```json
/// {
///   "T": "t",
///   "S": "AAPL240315C00172500",
///   "t": "2024-03-11T13:35:35.13312256Z",
///   "p": 2.84,
///   "s": 1,
///   "x": "N",
///   "c": "S"
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OptionTradeMessage {
    /// OCC option symbol
    pub symbol: String,

    /// Trade timestamp
    pub timestamp: Option<DateTime<Utc>>,

    /// Trade price
    pub price: Option<f64>,

    /// Trade size (contracts)
    pub size: Option<i64>,

    /// Exchange code where the trade occurred
    pub exchange: Option<String>,

    /// Trade condition codes
    pub conditions: Vec<String>,
}

impl From<OptionTradeMessage> for LiveTick {
    fn from(trade: OptionTradeMessage) -> Self {
        Self {
            symbol: Some(trade.symbol),
            time: trade.timestamp.into(),
            price: trade.price,
            size: trade.size,
            exchange: trade.exchange,
            conditions: trade.conditions,
        }
    }
}

/// A decoded stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum AlpacaMessage {
    /// Connection or authentication success.
    Success(SuccessMessage),
    /// Error report.
    Error(ErrorMessage),
    /// Subscription confirmation.
    Subscription(SubscriptionMessage),
    /// Option trade.
    OptionTrade(OptionTradeMessage),
    /// Any other message type, by its `T` value.
    Other(String),
}

// =============================================================================
// Outbound Messages (Client -> Server)
// =============================================================================

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Action: "auth"
    pub action: &'static str,

    /// API key
    pub key: String,

    /// API secret
    pub secret: String,
}

impl AuthRequest {
    /// Create a new authentication request.
    #[must_use]
    pub const fn new(key: String, secret: String) -> Self {
        Self {
            action: "auth",
            key,
            secret,
        }
    }
}

/// Trade channel subscribe or unsubscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeSubscription {
    /// `subscribe` or `unsubscribe`.
    pub action: &'static str,

    /// OCC symbols.
    pub trades: Vec<String>,
}

impl TradeSubscription {
    /// Subscribe to trades for `symbol`.
    #[must_use]
    pub fn subscribe(symbol: impl Into<String>) -> Self {
        Self {
            action: "subscribe",
            trades: vec![symbol.into()],
        }
    }

    /// Stop receiving trades for `symbol`.
    #[must_use]
    pub fn unsubscribe(symbol: impl Into<String>) -> Self {
        Self {
            action: "unsubscribe",
            trades: vec![symbol.into()],
        }
    }
}
