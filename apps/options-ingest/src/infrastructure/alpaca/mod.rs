//! Alpaca Options Stream Adapter
//!
//! WebSocket client for Alpaca's options market data stream
//! (`MessagePack` codec), used as the live trade feed.

pub mod auth;
pub mod codec;
pub mod messages;
pub mod opra;

pub use auth::{AuthError, AuthHandler, AuthState, Credentials};
pub use codec::{CodecError, MsgPackCodec};
pub use messages::{AlpacaMessage, OptionTradeMessage};
pub use opra::{OpraClientError, OpraFeedConfig, OpraLiveFeed, OptionsFeed};
