//! shard-node — the accounting shard binary.
//!
//! Startup sequence:
//!   1. Open the persistent store
//!   2. Build the engine from the typed configuration
//!   3. `serve` runs the always-on worker pool; the scan-* subcommands run
//!      one pass of a single scanner and exit, for operational use
//!      alongside (or instead of) the pool.

mod config;
mod root_config;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use config::ShardConfig;
use root_config::RootConfigClient;
use shard_engine::ShardEngine;
use shard_store::{LockRegistry, ShardDb};
use shard_worker::{LifecycleScanner, LoggingBroker, OutboxFlusher, ReminderScanner, RequestScanner, WorkerPool};

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the worker pool's scanner/flusher tasks until interrupted.
    Serve,
    /// One pass of the heartbeat scan, then exit.
    ScanHeartbeat,
    /// One pass of the deletion-attempt scan, then exit.
    ScanDelete,
    /// One pass of the capitalization scan, then exit.
    ScanCapitalize,
    /// One pass of the purge scan, then exit.
    ScanPurge,
    /// One pass of the outbox flusher, then exit.
    FlushOutbox,
    /// Runs `configure_account` for one account and, per §4.4 step 5, sets
    /// its interest rate from the root-config fetch API when it is new or
    /// has never had one established. Operational equivalent of the
    /// `ConfigureAccount` inbound message (§6) with no broker attached.
    ConfigureAccount {
        debtor_id: i64,
        creditor_id: i64,
        #[arg(long, default_value_t = 0.0)]
        negligible_amount: f32,
        #[arg(long, default_value_t = 0)]
        config_flags: i32,
        #[arg(long, default_value = "")]
        config_data: String,
    },
}

#[derive(Parser, Debug)]
struct Args {
    #[command(flatten)]
    shard: ShardConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shard=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!(data_dir = %args.shard.data_dir.display(), "shard node starting");

    std::fs::create_dir_all(&args.shard.data_dir)
        .with_context(|| format!("creating data dir {}", args.shard.data_dir.display()))?;

    let store = Arc::new(ShardDb::open(&args.shard.data_dir).context("opening shard database")?);
    let locks = Arc::new(LockRegistry::new());
    let engine = Arc::new(ShardEngine::new(store, locks, args.shard.to_engine_config()));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(engine, &args.shard).await,
        Command::ScanHeartbeat => {
            let scanner = LifecycleScanner::new(engine, chrono::Duration::days(3));
            let n = scanner.scan_heartbeat(chrono::Utc::now())?;
            info!(emitted = n, "heartbeat scan complete");
            Ok(())
        }
        Command::ScanDelete => {
            let scanner = LifecycleScanner::new(engine, chrono::Duration::days(3));
            let n = scanner.scan_delete(chrono::Utc::now())?;
            info!(deleted = n, "deletion scan complete");
            Ok(())
        }
        Command::ScanCapitalize => {
            let scanner = LifecycleScanner::new(engine, chrono::Duration::days(3));
            let n = scanner.scan_capitalize(chrono::Utc::now())?;
            info!(capitalized = n, "capitalization scan complete");
            Ok(())
        }
        Command::ScanPurge => {
            let scanner = LifecycleScanner::new(engine, chrono::Duration::days(3));
            let n = scanner.scan_purge(chrono::Utc::now())?;
            info!(purged = n, "purge scan complete");
            Ok(())
        }
        Command::FlushOutbox => {
            let flusher = OutboxFlusher::new(Arc::clone(&engine.store), Arc::new(LoggingBroker), 500);
            let n = flusher.flush_once()?;
            info!(flushed = n, "outbox flush complete");
            Ok(())
        }
        Command::ConfigureAccount { debtor_id, creditor_id, negligible_amount, config_flags, config_data } => {
            configure_account_and_set_rate(&engine, &args.shard, debtor_id, creditor_id, negligible_amount, config_flags, config_data).await
        }
    }
}

/// §4.4 step 5: after `configure_account` applies, a brand-new account or
/// one that has never had an interest rate established needs one fetched
/// from the debtor's root config and applied. A fetch failure is an
/// external-service error (§7): log it and leave the rate unset rather
/// than fail the whole configure call.
#[allow(clippy::too_many_arguments)]
async fn configure_account_and_set_rate(
    engine: &Arc<ShardEngine>,
    shard_config: &ShardConfig,
    debtor_id: i64,
    creditor_id: i64,
    negligible_amount: f32,
    config_flags: i32,
    config_data: String,
) -> anyhow::Result<()> {
    let now = chrono::Utc::now();
    let outcome = engine.configure_account(debtor_id, creditor_id, now, 0, negligible_amount, config_flags, config_data, now)?;
    info!(debtor_id, creditor_id, applied = outcome.applied, "account configured");

    if !outcome.should_set_interest_rate {
        return Ok(());
    }
    let Some(base_url) = &shard_config.root_config_fetch_url else {
        info!(debtor_id, "no root-config fetch URL configured, leaving interest rate unset");
        return Ok(());
    };

    let client = RootConfigClient::new(base_url.clone(), StdDuration::from_secs(shard_config.root_config_cache_ttl_secs));
    match client.get(debtor_id).await {
        Ok(root_config) => {
            engine.try_change_interest_rate(debtor_id, creditor_id, root_config.interest_rate_target, chrono::Utc::now())?;
        }
        Err(e) => {
            tracing::warn!(debtor_id, error = %e, "root config fetch failed, interest rate left unset");
        }
    }
    Ok(())
}

async fn serve(engine: Arc<ShardEngine>, shard_config: &ShardConfig) -> anyhow::Result<()> {
    // Drives prepared/finalization request scanning and the reminder pass
    // directly once at startup so a restart doesn't wait a full tick for
    // any work queued while the process was down.
    let now = chrono::Utc::now();
    RequestScanner::new(Arc::clone(&engine)).scan_once(now)?;
    ReminderScanner::new(Arc::clone(&engine)).scan_once(now)?;

    let pool = WorkerPool::new(Arc::clone(&engine), Arc::new(LoggingBroker));
    let handles = pool.spawn(StdDuration::from_millis(shard_config.tick_millis));

    info!("worker pool running, awaiting shutdown signal");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown signal received");

    for handle in handles {
        handle.abort();
    }
    Ok(())
}
