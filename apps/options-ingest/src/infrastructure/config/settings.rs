//! Ingest Settings
//!
//! Validated settings for both pipelines, built from parsed CLI arguments
//! plus environment tunables.
//!
//! # Environment Variables
//!
//! - `INGEST_PENDING_ID_THRESHOLD`: identifiers awaiting lookup before a flush (default: 200)
//! - `INGEST_BUFFERED_RECORD_THRESHOLD`: buffered replay records before a flush (default: 2000)
//! - `INGEST_RESOLVE_BATCH_SIZE`: identifiers per lookup request (default: 2000)
//! - `INGEST_METRICS_PORT`: Prometheus listener port, 0 disables (default: 0)

use std::time::Duration;

use chrono::NaiveDate;

use super::cli::{ReplayArgs, StreamArgs};
use crate::application::services::BufferSettings;
use crate::domain::contract::{ContractError, OptionContract};
use crate::domain::symbology::DateWindow;
use crate::infrastructure::alpaca::{AuthError, Credentials, OpraFeedConfig};
use crate::infrastructure::databento::{DatabentoConfig, RangeQuery};

/// Symbol list value meaning "no filter".
const ALL: &str = "ALL";

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is empty.
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),

    /// A flag has an unusable value.
    #[error("invalid value for {name}: {message}")]
    InvalidValue {
        /// Flag name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The option contract is malformed.
    #[error(transparent)]
    InvalidContract(#[from] ContractError),

    /// Credentials were rejected before connecting.
    #[error(transparent)]
    Credentials(#[from] AuthError),
}

// =============================================================================
// Replay
// =============================================================================

/// Settings for one historical replay run.
#[derive(Debug, Clone)]
pub struct ReplaySettings {
    /// Range request parameters.
    pub query: RangeQuery,
    /// HTTP client configuration.
    pub databento: DatabentoConfig,
}

impl ReplaySettings {
    /// Date window symbol lookups are scoped to.
    #[must_use]
    pub fn window(&self, today: NaiveDate) -> DateWindow {
        DateWindow::from_bounds(&self.query.start, self.query.end.as_deref(), today)
    }
}

impl TryFrom<ReplayArgs> for ReplaySettings {
    type Error = ConfigError;

    fn try_from(args: ReplayArgs) -> Result<Self, Self::Error> {
        if args.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("DATABENTO_API_KEY"));
        }
        if args.dataset.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "--dataset",
                message: "must not be empty".to_string(),
            });
        }
        if args.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "--timeout-secs",
                message: "must be positive".to_string(),
            });
        }

        let mut databento = DatabentoConfig::new(args.api_key.trim()).with_base_url(args.base_url);
        databento.request_timeout = Duration::from_secs(args.timeout_secs);

        let query = RangeQuery {
            dataset: args.dataset.trim().to_string(),
            schema: args.schema,
            start: args.start.trim().to_string(),
            end: non_empty(&args.end),
            symbols: normalize_symbols(&args.symbols),
            stype_in: non_empty(&args.stype_in),
            stype_out: non_empty(&args.stype_out),
            limit: args.limit,
        };

        Ok(Self { query, databento })
    }
}

/// Parse a `--symbols` value.
///
/// `ALL` in any case or a blank value selects every instrument.
#[must_use]
pub fn normalize_symbols(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
        return None;
    }

    let symbols: Vec<String> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    (!symbols.is_empty()).then_some(symbols)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// =============================================================================
// Stream
// =============================================================================

/// Settings for one live session.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Contract to stream.
    pub contract: OptionContract,
    /// Feed connection settings.
    pub feed: OpraFeedConfig,
}

impl TryFrom<StreamArgs> for StreamSettings {
    type Error = ConfigError;

    fn try_from(args: StreamArgs) -> Result<Self, Self::Error> {
        let contract = OptionContract::new(
            &args.symbol,
            &args.expiry,
            args.strike,
            &args.right,
            args.exchange.as_deref(),
            &args.currency,
        )?;

        if args.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("ALPACA_KEY"));
        }
        if args.api_secret.trim().is_empty() {
            return Err(ConfigError::MissingCredential("ALPACA_SECRET"));
        }
        let credentials = Credentials::new(args.api_key, args.api_secret)?;

        let mut feed = OpraFeedConfig::new(args.feed, credentials);
        if let Some(url) = args.url.as_deref().and_then(non_empty) {
            feed = feed.with_url(url);
        }

        Ok(Self { contract, feed })
    }
}

// =============================================================================
// Tunables
// =============================================================================

/// Replay buffering thresholds from the environment.
#[must_use]
pub fn buffer_settings_from_env() -> BufferSettings {
    buffer_settings_from_lookup(|key| std::env::var(key).ok())
}

fn buffer_settings_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BufferSettings {
    let defaults = BufferSettings::default();
    BufferSettings {
        pending_id_threshold: parse_positive_usize(
            &lookup,
            "INGEST_PENDING_ID_THRESHOLD",
            defaults.pending_id_threshold,
        ),
        buffered_record_threshold: parse_positive_usize(
            &lookup,
            "INGEST_BUFFERED_RECORD_THRESHOLD",
            defaults.buffered_record_threshold,
        ),
        resolve_batch_size: parse_positive_usize(
            &lookup,
            "INGEST_RESOLVE_BATCH_SIZE",
            defaults.resolve_batch_size,
        ),
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Prometheus listener port (0 = disabled).
    pub port: u16,
}

impl MetricsSettings {
    /// Read settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: parse_u16(&lookup, "INGEST_METRICS_PORT", 0),
        }
    }
}

fn parse_u16(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_positive_usize(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
