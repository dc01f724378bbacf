//! Live Feed Port (Driven Port)
//!
//! Push contract for the live pipeline. The feed owns the event loop and
//! calls the [`TickHandler`] synchronously once per trade notification.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::contract::OptionContract;
use crate::domain::timestamp::TimeValue;

use super::payload_sink_port::EmitError;

/// One trade notification from a live feed.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTick {
    /// Symbol the feed reported, if any.
    pub symbol: Option<String>,
    /// Exchange time of the last trade ([`TimeValue::Missing`] if absent).
    pub time: TimeValue,
    /// Last trade price.
    pub price: Option<f64>,
    /// Last trade size.
    pub size: Option<i64>,
    /// Exchange of the last trade.
    pub exchange: Option<String>,
    /// Trade condition codes.
    pub conditions: Vec<String>,
}

/// A contract the feed accepted and subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedContract {
    /// Symbol trades are reported under.
    pub symbol: String,
    /// Exchange to fall back to when a trade carries none.
    pub exchange: Option<String>,
}

/// Live feed error.
#[derive(Debug, thiserror::Error)]
pub enum LiveFeedError {
    /// Connecting or authenticating failed.
    #[error("live feed connection failed: {0}")]
    Connection(String),

    /// The contract could not be qualified.
    #[error("contract qualification failed: {0}")]
    Qualification(String),

    /// The stream failed after the session was established.
    #[error("live feed stream error: {0}")]
    Stream(String),

    /// The handler failed to emit a payload.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Receives live trade notifications.
pub trait TickHandler {
    /// Handle one notification.
    ///
    /// # Errors
    ///
    /// Returns an error only when output fails; incomplete ticks are dropped.
    fn on_tick(&mut self, tick: &LiveTick) -> Result<(), EmitError>;
}

/// A push-driven live market data session.
#[async_trait]
pub trait LiveFeed: Send {
    /// Open and authenticate the session.
    async fn connect(&mut self) -> Result<(), LiveFeedError>;

    /// Validate `contract` with the feed and subscribe to its trades.
    async fn qualify(
        &mut self,
        contract: &OptionContract,
    ) -> Result<QualifiedContract, LiveFeedError>;

    /// Deliver ticks to `handler` until `shutdown` fires or the feed ends.
    async fn run(
        &mut self,
        handler: &mut (dyn TickHandler + Send),
        shutdown: CancellationToken,
    ) -> Result<(), LiveFeedError>;

    /// Close the session. Safe to call more than once.
    async fn disconnect(&mut self) -> Result<(), LiveFeedError>;
}
