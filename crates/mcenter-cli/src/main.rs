//! mcenter demo binary
//!
//! Wires a message center with a durable store and OS-signal shutdown,
//! publishes a demo batch and drains on Ctrl-C / SIGTERM. Items interrupted by
//! the signal are parked in the store and resumed by the next run.

mod demo;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use mcenter_core::impls::{FileStore, OsSignalRegistrar};
use mcenter_core::ports::{IdGenerator, StoreClient, SystemClock, UlidGenerator, UuidGenerator};
use mcenter_core::{Config, MessageCenter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Message center demo
#[derive(Parser, Debug)]
#[command(name = "mcenter")]
#[command(about = "Publishes a demo batch through an mcenter message center")]
struct Args {
    /// Config file (TOML / JSON / YAML); MCENTER_* variables override it
    #[arg(long, env = "MCENTER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for parked items
    #[arg(long, env = "MCENTER_STORE_DIR", default_value = ".mcenter")]
    store_dir: PathBuf,

    /// Park items in redis instead of the store directory
    #[cfg(feature = "redis")]
    #[arg(long, env = "MCENTER_REDIS_URL")]
    redis_url: Option<String>,

    /// Number of messages to publish
    #[arg(long, default_value = "6")]
    messages: u64,

    /// How long the slow demo handlers take
    #[arg(long, default_value = "200")]
    handler_delay_ms: u64,

    /// Shut down once the batch finished instead of waiting for a signal
    #[arg(long, default_value = "false")]
    exit_when_done: bool,

    /// Mint time-sortable ULID-based ids instead of random UUIDs
    #[arg(long, env = "MCENTER_ULID_IDS", default_value = "false")]
    ulid_ids: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "MCENTER_JSON_LOGS", default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.json_logs);

    let config = Config::load(args.config.as_deref()).context("loading config")?;
    let store = open_store(&args).await?;
    let signals = OsSignalRegistrar::new(Handle::current());

    let center = MessageCenter::builder()
        .config(config)
        .store(store)
        .id_generator(id_generator(args.ulid_ids))
        .shutdown(&signals)
        .build()?;

    let delay = Duration::from_millis(args.handler_delay_ms);
    demo::wire(&center, delay)?;
    center.set_notifier("timeout", |n| warn!(notification = ?n, "handler over budget"))?;

    tokio::select! {
        failed = run_batch(&center, args.messages) => {
            info!(messages = args.messages, failed, "batch finished");
            if args.exit_when_done {
                center.shutdown().await;
            } else {
                info!("waiting for Ctrl-C");
                signals.terminated().await;
            }
        }
        _ = signals.terminated() => {
            info!("interrupted during batch");
        }
    }

    center.close().await;
    println!("{}", serde_json::to_string_pretty(&center.get_stats())?);
    Ok(())
}

fn id_generator(ulid: bool) -> Arc<dyn IdGenerator> {
    if ulid {
        Arc::new(UlidGenerator::new(SystemClock))
    } else {
        Arc::new(UuidGenerator)
    }
}

async fn open_store(args: &Args) -> Result<Arc<dyn StoreClient>> {
    #[cfg(feature = "redis")]
    if let Some(url) = &args.redis_url {
        let store = mcenter_core::impls::RedisStore::connect(url)
            .await
            .context("connecting to redis")?;
        return Ok(Arc::new(store));
    }

    let store = FileStore::open(&args.store_dir)
        .await
        .with_context(|| format!("opening store directory {}", args.store_dir.display()))?;
    Ok(Arc::new(store))
}

/// Publishes the batch concurrently and returns how many messages had at
/// least one failed type.
async fn run_batch(center: &MessageCenter, messages: u64) -> usize {
    let mut pending = JoinSet::new();
    for i in 0..messages {
        let center = center.clone();
        pending.spawn(async move {
            let (name, data) = demo::payload(i);
            center.publish_and_wait(name, data).await
        });
    }

    let mut failed = 0;
    while let Some(joined) = pending.join_next().await {
        match joined {
            Ok(Ok(result)) if result.values().all(|outcome| outcome.is_ok()) => {}
            Ok(Ok(_)) => failed += 1,
            Ok(Err(e)) => {
                warn!(error = %e, "publish failed");
                failed += 1;
            }
            Err(e) => {
                warn!(error = %e, "publish task aborted");
                failed += 1;
            }
        }
    }
    failed
}
