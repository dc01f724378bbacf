//! OPRA WebSocket Live Feed
//!
//! Streams trades for a single option contract from Alpaca's options
//! stream and implements the [`LiveFeed`] port.
//!
//! # Stream URL
//!
//! - Indicative: `wss://stream.data.alpaca.markets/v1beta1/indicative`
//! - OPRA: `wss://stream.data.alpaca.markets/v1beta1/opra`
//!
//! # Protocol
//!
//! All messages (including auth and subscriptions) use `MessagePack`
//! binary encoding; the server rejects JSON with error 412.
//!
//! # Session
//!
//! 1. [`connect`](LiveFeed::connect): open the socket and authenticate
//! 2. [`qualify`](LiveFeed::qualify): subscribe to the contract's trades
//!    and wait for the confirmation
//! 3. [`run`](LiveFeed::run): deliver trades until shutdown
//! 4. [`disconnect`](LiveFeed::disconnect): unsubscribe and close

use std::collections::VecDeque;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::auth::{AUTH_TIMEOUT, AuthError, AuthHandler, AuthStep, Credentials};
use super::codec::{CodecError, MsgPackCodec};
use super::messages::{AlpacaMessage, OptionTradeMessage, TradeSubscription};
use crate::application::ports::{
    LiveFeed, LiveFeedError, LiveTick, QualifiedContract, TickHandler,
};
use crate::domain::contract::OptionContract;

/// Time allowed for a subscription confirmation.
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settlement currency of every listed contract on the feed.
const FEED_CURRENCY: &str = "USD";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the OPRA client.
#[derive(Debug, thiserror::Error)]
pub enum OpraClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No session is open.
    #[error("not connected")]
    NotConnected,

    /// The server did not answer in time.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// The server reported an error.
    #[error("server error ({code}): {message}")]
    Server {
        /// Error code from server.
        code: i32,
        /// Error message from server.
        message: String,
    },

    /// The confirmed subscription set does not include the symbol.
    #[error("subscription not confirmed for {0}")]
    NotSubscribed(String),

    /// The contract settles in a currency the feed does not carry.
    #[error("unsupported currency {0:?}: the options feed only lists {FEED_CURRENCY} contracts")]
    UnsupportedCurrency(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Configuration
// =============================================================================

/// Options data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionsFeed {
    /// Indicative data, available on the basic plan.
    #[default]
    Indicative,
    /// Full OPRA feed.
    Opra,
}

impl OptionsFeed {
    /// WebSocket URL of this feed.
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::Indicative => "wss://stream.data.alpaca.markets/v1beta1/indicative",
            Self::Opra => "wss://stream.data.alpaca.markets/v1beta1/opra",
        }
    }
}

impl FromStr for OptionsFeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indicative" => Ok(Self::Indicative),
            "opra" => Ok(Self::Opra),
            other => Err(format!(
                "unknown options feed {other:?}: expected indicative or opra"
            )),
        }
    }
}

impl std::fmt::Display for OptionsFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indicative => write!(f, "indicative"),
            Self::Opra => write!(f, "opra"),
        }
    }
}

/// Configuration for the OPRA feed.
#[derive(Debug, Clone)]
pub struct OpraFeedConfig {
    /// WebSocket URL.
    pub url: String,
    /// API credentials.
    pub credentials: Credentials,
}

impl OpraFeedConfig {
    /// Configuration for a named feed.
    #[must_use]
    pub fn new(feed: OptionsFeed, credentials: Credentials) -> Self {
        Self {
            url: feed.url().to_string(),
            credentials,
        }
    }

    /// Override the WebSocket URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

// =============================================================================
// OPRA Live Feed
// =============================================================================

/// Single-contract live trade feed.
///
/// Trades that arrive between the subscribe request and its confirmation
/// are held back and delivered first when [`run`](LiveFeed::run) starts.
pub struct OpraLiveFeed {
    url: String,
    codec: MsgPackCodec,
    auth: AuthHandler,
    socket: Option<WsStream>,
    symbol: Option<String>,
    backlog: VecDeque<OptionTradeMessage>,
}

impl std::fmt::Debug for OpraLiveFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpraLiveFeed")
            .field("url", &self.url)
            .field("connected", &self.socket.is_some())
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

impl OpraLiveFeed {
    /// Create a disconnected feed.
    #[must_use]
    pub fn new(config: OpraFeedConfig) -> Self {
        Self {
            url: config.url,
            codec: MsgPackCodec::new(),
            auth: AuthHandler::new(config.credentials),
            socket: None,
            symbol: None,
            backlog: VecDeque::new(),
        }
    }

    async fn open(&mut self) -> Result<(), OpraClientError> {
        tracing::info!(url = %self.url, "Connecting to options stream");

        let (socket, _response) = tokio_tungstenite::connect_async(&self.url).await?;
        self.socket = Some(socket);
        self.auth.reset();

        tokio::time::timeout(AUTH_TIMEOUT, self.authenticate())
            .await
            .map_err(|_| OpraClientError::Timeout("authentication"))??;

        tracing::info!("Options stream authenticated");
        Ok(())
    }

    async fn authenticate(&mut self) -> Result<(), OpraClientError> {
        loop {
            for message in self.next_messages().await? {
                match message {
                    AlpacaMessage::Success(success) => match self.auth.on_success(&success) {
                        AuthStep::Send(request) => self.send(&request).await?,
                        AuthStep::Done => return Ok(()),
                    },
                    AlpacaMessage::Error(error) => return Err(self.auth.on_error(&error).into()),
                    other => tracing::trace!(?other, "Ignoring message during handshake"),
                }
            }
        }
    }

    async fn subscribe(&mut self, contract: &OptionContract) -> Result<String, OpraClientError> {
        if contract.currency() != FEED_CURRENCY {
            return Err(OpraClientError::UnsupportedCurrency(
                contract.currency().to_string(),
            ));
        }
        if !self.auth.is_authenticated() {
            return Err(OpraClientError::NotConnected);
        }

        let symbol = contract.occ_symbol();
        tracing::debug!(symbol = %symbol, "Sending subscribe request");
        self.send(&TradeSubscription::subscribe(symbol.clone()))
            .await?;

        tokio::time::timeout(SUBSCRIBE_TIMEOUT, self.await_subscription(&symbol))
            .await
            .map_err(|_| OpraClientError::Timeout("subscription"))??;

        Ok(symbol)
    }

    async fn await_subscription(&mut self, symbol: &str) -> Result<(), OpraClientError> {
        loop {
            for message in self.next_messages().await? {
                match message {
                    AlpacaMessage::Subscription(sub) if sub.trades.iter().any(|s| s == symbol) => {
                        return Ok(());
                    }
                    AlpacaMessage::Subscription(_) => {
                        return Err(OpraClientError::NotSubscribed(symbol.to_string()));
                    }
                    AlpacaMessage::Error(error) => {
                        return Err(OpraClientError::Server {
                            code: error.code,
                            message: error.msg,
                        });
                    }
                    AlpacaMessage::OptionTrade(trade) => self.backlog.push_back(trade),
                    other => tracing::trace!(?other, "Ignoring message before confirmation"),
                }
            }
        }
    }

    /// Read frames until one carries messages.
    async fn next_messages(&mut self) -> Result<Vec<AlpacaMessage>, OpraClientError> {
        let socket = self.socket.as_mut().ok_or(OpraClientError::NotConnected)?;
        loop {
            match socket.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(self.codec.decode(&data)?),
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(text = %text.as_str(), "Ignoring text frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Server sent close frame");
                    return Err(OpraClientError::ConnectionClosed);
                }
                // Ping replies are queued by the protocol layer.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(OpraClientError::ConnectionClosed),
            }
        }
    }

    async fn send<T: serde::Serialize + Sync>(&mut self, value: &T) -> Result<(), OpraClientError> {
        let bytes = self.codec.encode_named(value)?;
        let socket = self.socket.as_mut().ok_or(OpraClientError::NotConnected)?;
        socket.send(Message::Binary(bytes.into())).await?;
        Ok(())
    }

    fn deliver(
        &self,
        handler: &mut (dyn TickHandler + Send),
        trade: OptionTradeMessage,
    ) -> Result<(), LiveFeedError> {
        if self.symbol.as_deref().is_some_and(|s| s != trade.symbol) {
            tracing::trace!(symbol = %trade.symbol, "Ignoring trade for another symbol");
            return Ok(());
        }
        handler.on_tick(&LiveTick::from(trade))?;
        Ok(())
    }
}

#[async_trait]
impl LiveFeed for OpraLiveFeed {
    async fn connect(&mut self) -> Result<(), LiveFeedError> {
        match self.open().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.socket = None;
                Err(LiveFeedError::Connection(e.to_string()))
            }
        }
    }

    async fn qualify(
        &mut self,
        contract: &OptionContract,
    ) -> Result<QualifiedContract, LiveFeedError> {
        let symbol = self
            .subscribe(contract)
            .await
            .map_err(|e| LiveFeedError::Qualification(e.to_string()))?;

        tracing::info!(symbol = %symbol, "Subscribed to option trades");
        self.symbol = Some(symbol.clone());
        Ok(QualifiedContract {
            symbol,
            exchange: contract.exchange().map(str::to_string),
        })
    }

    async fn run(
        &mut self,
        handler: &mut (dyn TickHandler + Send),
        shutdown: CancellationToken,
    ) -> Result<(), LiveFeedError> {
        while let Some(trade) = self.backlog.pop_front() {
            self.deliver(handler, trade)?;
        }

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::info!("Live feed shutdown requested");
                    return Ok(());
                }
                messages = self.next_messages() => {
                    let messages = messages.map_err(|e| LiveFeedError::Stream(e.to_string()))?;
                    for message in messages {
                        match message {
                            AlpacaMessage::OptionTrade(trade) => self.deliver(handler, trade)?,
                            AlpacaMessage::Error(error) => {
                                tracing::warn!(code = error.code, msg = %error.msg, "Options stream error");
                            }
                            other => tracing::trace!(?other, "Ignoring message"),
                        }
                    }
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), LiveFeedError> {
        if let Some(symbol) = self.symbol.take()
            && self.socket.is_some()
        {
            let request = TradeSubscription::unsubscribe(symbol);
            if let Err(e) = self.send(&request).await {
                tracing::debug!(error = %e, "Unsubscribe failed");
            }
        }

        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                tracing::debug!(error = %e, "Close handshake failed");
            }
            tracing::info!("Options stream disconnected");
        }

        self.auth.reset();
        self.backlog.clear();
        Ok(())
    }
}
