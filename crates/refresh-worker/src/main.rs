//! refresh-worker: periodically score the configured symbols and store the
//! signals plus the daily market summary.
//!
//! Usage:
//!   cargo run -p refresh-worker                               # loop every REFRESH_INTERVAL_SECS
//!   cargo run -p refresh-worker -- --once --symbols TCS INFY  # single cycle
//!   cargo run -p refresh-worker -- --once --quotes-file quotes.json --db sqlite://signals.db

use quote_client::{SnapshotQuoteProvider, YahooQuoteClient};
use refresh_worker::{RefreshConfig, RefreshWorker, SignalEvent};
use signal_core::{QuoteProvider, SignalStore};
use signal_engine::{trending, DEFAULT_TRENDING_LIMIT};
use signal_store::{MemorySignalStore, SqliteSignalStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "refresh_worker=info,quote_client=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let once = args.iter().any(|a| a == "--once");
    let mut config = RefreshConfig::from_env();

    if let Some(idx) = args.iter().position(|a| a == "--symbols") {
        let symbols: Vec<String> = args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|s| s.to_uppercase())
            .collect();
        if symbols.is_empty() {
            anyhow::bail!("--symbols needs at least one ticker");
        }
        config.symbols = symbols;
    }
    if let Some(path) = flag_value(&args, "--quotes-file") {
        config.quotes_file = Some(PathBuf::from(path));
    }
    if let Some(url) = flag_value(&args, "--db") {
        config.database_url = Some(url.to_string());
    }
    if let Some(secs) = flag_value(&args, "--interval").and_then(|v| v.parse::<u64>().ok()) {
        config.interval = Duration::from_secs(secs.max(1));
    }

    let provider: Arc<dyn QuoteProvider> = match &config.quotes_file {
        Some(path) => {
            let snapshot = SnapshotQuoteProvider::from_json_file(path)?;
            tracing::info!("Serving {} quotes from {}", snapshot.len(), path.display());
            Arc::new(snapshot)
        }
        None => {
            let mut client = YahooQuoteClient::new();
            if let Some(base_url) = &config.yahoo_base_url {
                client = client.with_base_url(base_url.clone());
            }
            if let Some(suffix) = &config.symbol_suffix {
                client = client.with_suffix(suffix.clone());
            }
            Arc::new(client)
        }
    };

    let store: Arc<dyn SignalStore> = match &config.database_url {
        Some(url) => Arc::new(SqliteSignalStore::new(url).await?),
        None => {
            tracing::info!("DATABASE_URL not set, keeping signals in memory");
            Arc::new(MemorySignalStore::new())
        }
    };

    let (worker, events) = RefreshWorker::new(provider, Arc::clone(&store), &config);
    let event_logger = tokio::spawn(log_events(events));

    if once {
        let report = worker.run_cycle().await?;
        for signal in &report.sample {
            tracing::info!(
                "  {} ₹{:.2} {:+.2}% tag={} sentiment={:.2} rsi~{:.1}",
                signal.symbol,
                signal.price,
                signal.change_percent,
                signal.ai_tag,
                signal.sentiment,
                signal.rsi_approx
            );
        }

        let stored = store.signals().await?;
        let trending_now: Vec<String> = trending(&stored, DEFAULT_TRENDING_LIMIT)
            .into_iter()
            .map(|s| s.symbol)
            .collect();
        tracing::info!("Trending: {}", trending_now.join(", "));

        drop(worker);
        event_logger.await.ok();
        return Ok(());
    }

    let worker = Arc::new(worker);
    let shutdown = Arc::new(Notify::new());
    let runner = {
        let worker = Arc::clone(&worker);
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    tracing::info!(
        "Refreshing {} symbols every {}s (Ctrl-C to stop)",
        config.symbols.len(),
        config.interval.as_secs()
    );
    tokio::signal::ctrl_c().await?;
    shutdown.notify_one();
    runner.await?;

    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

async fn log_events(mut events: broadcast::Receiver<SignalEvent>) {
    loop {
        match events.recv().await {
            Ok(SignalEvent::SignalsUpdated { cycle, updated, skipped, summary, at }) => match summary {
                Some(summary) => tracing::info!(
                    "[{}] cycle {}: {} signals ({} skipped), fear/greed {} {} vix~{:.1} ({})",
                    at.format("%H:%M:%S"),
                    cycle,
                    updated,
                    skipped,
                    summary.fear_greed_score,
                    summary.market_mood,
                    summary.vix_approx,
                    summary.vix_band().label()
                ),
                None => tracing::info!("[{}] cycle {}: {} signals ({} skipped)", at.format("%H:%M:%S"), cycle, updated, skipped),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Event logger lagged, {} events dropped", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  refresh-worker                         Refresh on an interval until Ctrl-C");
    eprintln!("  refresh-worker --once                  Run a single cycle and exit");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --symbols TCS INFY ...   Symbols to refresh (default: REFRESH_SYMBOLS or 30 NSE large caps)");
    eprintln!("  --quotes-file PATH       Read quotes from a JSON file instead of the live API");
    eprintln!("  --db URL                 SQLite URL (default: DATABASE_URL, else in-memory)");
    eprintln!("  --interval SECS          Seconds between cycles (default: 60)");
}
