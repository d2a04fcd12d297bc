use chrono::{Timelike, Utc};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use trendbot::api::NorenClient;
use trendbot::config::{self, Settings};
use trendbot::execution::{BarFeed, OrderDispatcher};
use trendbot::models::Instrument;
use trendbot::persistence::SnapshotWriter;
use trendbot::strategy::{SymbolState, TrendFollowConfig, TrendFollowStrategy};
use trendbot::Result;

const LOG_FILE: &str = "trendbot.log";

#[derive(Parser, Debug)]
#[command(name = "trendbot", about = "Supertrend minute-bar trading client")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Log would-be orders without submitting them
    #[arg(long)]
    dry_run: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Seconds to wait from `second` within the current minute until the next
/// minute boundary
///
/// The minute must change before the first tick fires, so at an exact
/// boundary the wait is a full minute.
fn seconds_until_next_minute(second: u32) -> u64 {
    60 - second as u64
}

fn next_minute_boundary() -> Instant {
    let now = Utc::now();
    Instant::now() + Duration::from_secs(seconds_until_next_minute(now.second()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging()?;

    tracing::info!("🚀 trendbot starting");

    let settings = config::load(&cli.config)?;
    let session_start = settings.session_start()?;

    // Login and create a session
    let mut client = NorenClient::new(settings.base_url.clone());
    let token = client.login(&settings.credentials).await?;
    client.set_session(&settings.credentials.user, &token);
    tracing::info!("✅ Logged in as {}", settings.credentials.user);

    // Resolve symbols to instrument tokens, once
    let instruments = resolve_instruments(&client, &settings).await?;
    if instruments.is_empty() {
        return Err("no configured symbol resolved to a tradable instrument".into());
    }

    let strategy_config = TrendFollowConfig {
        quantity: settings.quantity,
        ..Default::default()
    };
    let strategy = TrendFollowStrategy::new(strategy_config.clone());
    let feed = BarFeed::new(
        client.clone(),
        session_start,
        strategy_config.length,
        strategy_config.multiplier,
    );
    let dispatcher = OrderDispatcher::new(client.clone(), cli.dry_run);
    let snapshots = SnapshotWriter::new(settings.snapshot_dir.clone());

    let mut states: HashMap<String, SymbolState> = instruments
        .iter()
        .map(|i| (i.symbol.clone(), SymbolState::default()))
        .collect();

    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Exchange: {}", settings.exchange);
    tracing::info!("  Quantity: {}", settings.quantity);
    tracing::info!("  Session start: {}", settings.start_time);
    tracing::info!("  Dry run: {}", cli.dry_run);
    tracing::info!("  Instruments: {}", instruments.len());
    for instrument in &instruments {
        tracing::info!("    - {} (token {})", instrument.symbol, instrument.token);
    }

    // Tick once per wall-clock minute; a tick that overruns its minute is
    // skipped rather than bunched up
    let mut ticker = interval_at(next_minute_boundary(), Duration::from_secs(60));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!("\n🔄 Polling every minute. Press Ctrl+C to stop...\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {
                run_tick(&instruments, &feed, &strategy, &dispatcher, &snapshots, &mut states).await;
            }
        }
    }

    tracing::info!("👋 trendbot stopped");
    Ok(())
}

// ============================================================================
// Initialization Functions
// ============================================================================

fn setup_logging() -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trendbot=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .init();

    Ok(())
}

async fn resolve_instruments(client: &NorenClient, settings: &Settings) -> Result<Vec<Instrument>> {
    tracing::info!("🔍 Resolving {} symbols...", settings.symbols.len());

    let mut instruments = Vec::new();
    for symbol in &settings.symbols {
        match client.resolve_token(&settings.exchange, symbol).await {
            Ok(Some(token)) => {
                tracing::info!("  ✓ {} -> token {}", symbol, token);
                instruments.push(Instrument {
                    symbol: symbol.clone(),
                    token,
                    exchange: settings.exchange.clone(),
                });
            }
            Ok(None) => {
                tracing::warn!("  ✗ {} not found on {}, skipping", symbol, settings.exchange);
            }
            Err(e) => {
                tracing::warn!("  ✗ {} resolution failed: {}, skipping", symbol, e);
            }
        }
    }

    Ok(instruments)
}

// ============================================================================
// Poll Loop
// ============================================================================

/// One tick: fetch, snapshot, evaluate and dispatch for every instrument,
/// sequentially
///
/// Every per-symbol failure is logged and skips only that symbol.
async fn run_tick(
    instruments: &[Instrument],
    feed: &BarFeed,
    strategy: &TrendFollowStrategy,
    dispatcher: &OrderDispatcher,
    snapshots: &SnapshotWriter,
    states: &mut HashMap<String, SymbolState>,
) {
    tracing::info!("🔄 Tick at {}", Utc::now().format("%H:%M:%S"));

    for instrument in instruments {
        let series = match feed.fetch(instrument).await {
            Ok(series) => series,
            Err(e) => {
                tracing::error!("  ✗ {} fetch failed: {}", instrument.symbol, e);
                continue;
            }
        };

        if let Err(e) = snapshots.write(&instrument.symbol, &series) {
            tracing::warn!("  ✗ {} snapshot write failed: {}", instrument.symbol, e);
        }

        let state = states.entry(instrument.symbol.clone()).or_default();
        let intents = strategy.evaluate(&series, state);

        if intents.is_empty() {
            tracing::debug!("  {} no signal ({} bars)", instrument.symbol, series.len());
            continue;
        }

        let close = series.bars.last().map(|b| b.close).unwrap_or_default();
        tracing::info!(
            "  📉 {} downtrend entry at {:.2} (stop: {:?})",
            instrument.symbol,
            close,
            state.stoploss_price
        );
        dispatcher.dispatch(instrument, &intents).await;
    }
}
