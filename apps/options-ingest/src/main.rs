//! Options Ingest Binary
//!
//! Emits canonical option trade payloads, one JSON object per line, on
//! stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! options-ingest replay --dataset OPRA.PILLAR --start 2024-01-02 --end 2024-01-03
//! options-ingest stream --symbol SPY --expiry 20240119 --strike 470 --right C
//! ```
//!
//! # Environment Variables
//!
//! ## Credentials
//! - `DATABENTO_API_KEY`: Databento API key (replay)
//! - `ALPACA_KEY`, `ALPACA_SECRET`: Alpaca API credentials (stream)
//!
//! ## Optional
//! - `DATABENTO_BASE_URL`: historical API endpoint
//! - `ALPACA_OPTIONS_FEED`: indicative | opra (default: indicative)
//! - `INGEST_PENDING_ID_THRESHOLD`, `INGEST_BUFFERED_RECORD_THRESHOLD`,
//!   `INGEST_RESOLVE_BATCH_SIZE`: replay buffering
//! - `INGEST_METRICS_PORT`: Prometheus port (default: 0, disabled)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `RUST_LOG`: Log filter (default: `options_ingest=info`)

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use options_ingest::infrastructure::config::{
    Cli, Command, MetricsSettings, ReplaySettings, StreamSettings, buffer_settings_from_env,
    load_dotenv,
};
use options_ingest::infrastructure::telemetry;
use options_ingest::{
    DatabentoHttpClient, DatabentoSymbologyAdapter, JsonLinesEmitter, LiveFeed, LiveTickHandler,
    OpraLiveFeed, ReplayCoordinator, SymbolResolver, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let dotenv = load_dotenv();
    let cli = Cli::parse();

    let _telemetry_guard = match telemetry::init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Ingest failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let metrics = MetricsSettings::from_env();
    init_metrics(metrics.port).context("failed to install Prometheus exporter")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown.clone()));

    match cli.command {
        Command::Replay(args) => replay(ReplaySettings::try_from(args)?, shutdown).await,
        Command::Stream(args) => stream(StreamSettings::try_from(args)?, shutdown).await,
    }
}

async fn replay(settings: ReplaySettings, shutdown: CancellationToken) -> anyhow::Result<()> {
    let window = settings.window(Utc::now().date_naive());
    let buffer = buffer_settings_from_env();
    tracing::info!(
        dataset = %settings.query.dataset,
        schema = %settings.query.schema,
        window_start = %window.start,
        window_end = ?window.end,
        pending_id_threshold = buffer.pending_id_threshold,
        buffered_record_threshold = buffer.buffered_record_threshold,
        "Starting replay"
    );

    let client = DatabentoHttpClient::new(&settings.databento)?;
    let mut source = client
        .get_range(&settings.query)
        .await
        .context("failed to open historical range")?;

    let resolver = SymbolResolver::new(
        DatabentoSymbologyAdapter::new(client),
        settings.query.dataset.clone(),
        window,
    );
    let mut coordinator = ReplayCoordinator::new(resolver, JsonLinesEmitter::stdout(), buffer);

    let stats = tokio::select! {
        result = coordinator.run(&mut source) => result?,
        () = shutdown.cancelled() => {
            tracing::info!("Replay interrupted, flushing buffered records");
            coordinator.finish().await?
        }
    };

    tracing::info!(
        received = stats.received,
        emitted = stats.emitted,
        dropped = stats.dropped,
        fallback = stats.fallback,
        batches = stats.batches,
        "Replay complete"
    );
    Ok(())
}

async fn stream(settings: StreamSettings, shutdown: CancellationToken) -> anyhow::Result<()> {
    tracing::info!(
        contract = %settings.contract.occ_symbol(),
        url = %settings.feed.url,
        "Starting live stream"
    );

    let mut feed = OpraLiveFeed::new(settings.feed);
    feed.connect()
        .await
        .context("failed to connect to live feed")?;

    let qualified = match feed.qualify(&settings.contract).await {
        Ok(qualified) => qualified,
        Err(e) => {
            if let Err(close) = feed.disconnect().await {
                tracing::warn!(error = %close, "Disconnect after failed qualification");
            }
            return Err(e).context("contract qualification failed");
        }
    };

    let mut handler = LiveTickHandler::new(JsonLinesEmitter::stdout(), &qualified);
    let result = feed.run(&mut handler, shutdown).await;

    if let Err(e) = feed.disconnect().await {
        tracing::warn!(error = %e, "Disconnect failed");
    }
    result.context("live stream failed")?;

    let stats = handler.stats();
    tracing::info!(
        received = stats.received,
        emitted = stats.emitted,
        incomplete = stats.incomplete,
        duplicates = stats.duplicates,
        "Live stream stopped"
    );
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then cancel `shutdown_token`.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
