//! Command-line arguments.
//!
//! Every credential and endpoint flag falls back to an environment variable,
//! so a `.env` file is enough for local runs.

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

use crate::infrastructure::alpaca::OptionsFeed;
use crate::infrastructure::databento::DEFAULT_BASE_URL;

/// Options trade ingestion.
#[derive(Debug, Parser)]
#[command(name = "options-ingest", version, about)]
pub struct Cli {
    /// Pipeline to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Pipelines.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay historical trades from Databento.
    Replay(ReplayArgs),
    /// Stream live trades for one option contract.
    Stream(StreamArgs),
}

/// `replay` arguments.
#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Dataset code, e.g. OPRA.PILLAR.
    #[arg(long)]
    pub dataset: String,

    /// Record schema.
    #[arg(long, default_value = "trades")]
    pub schema: String,

    /// Range start (ISO 8601 date or date-time).
    #[arg(long)]
    pub start: String,

    /// Range end, exclusive.
    #[arg(long, default_value = "")]
    pub end: String,

    /// Comma-separated symbols, or ALL.
    #[arg(long, default_value = "ALL")]
    pub symbols: String,

    /// Input symbology type.
    #[arg(long, default_value = "raw_symbol")]
    pub stype_in: String,

    /// Output symbology type.
    #[arg(long, default_value = "raw_symbol")]
    pub stype_out: String,

    /// Maximum number of records (0 for no limit).
    #[arg(long, default_value_t = 0)]
    pub limit: u64,

    /// Databento API key.
    #[arg(long, env = "DATABENTO_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// Historical API base URL.
    #[arg(long, env = "DATABENTO_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Symbology request timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

/// `stream` arguments.
#[derive(Debug, Clone, Args)]
pub struct StreamArgs {
    /// Underlying symbol.
    #[arg(long)]
    pub symbol: String,

    /// Expiry as YYYYMMDD.
    #[arg(long)]
    pub expiry: String,

    /// Strike price.
    #[arg(long)]
    pub strike: Decimal,

    /// Right: C, P, CALL or PUT.
    #[arg(long)]
    pub right: String,

    /// Listing exchange, used when a trade reports none.
    #[arg(long)]
    pub exchange: Option<String>,

    /// Settlement currency.
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Options feed: indicative or opra.
    #[arg(long, env = "ALPACA_OPTIONS_FEED", default_value_t = OptionsFeed::Indicative)]
    pub feed: OptionsFeed,

    /// WebSocket URL override.
    #[arg(long, env = "ALPACA_OPTIONS_STREAM_URL")]
    pub url: Option<String>,

    /// Alpaca API key.
    #[arg(long, env = "ALPACA_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// Alpaca API secret.
    #[arg(long, env = "ALPACA_SECRET", hide_env_values = true, default_value = "")]
    pub api_secret: String,
}
