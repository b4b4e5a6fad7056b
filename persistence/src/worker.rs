//! Bounded background worker pool running scheduled `backup`/`cleanup`
//! (§4.3 "A bounded worker pool runs background tasks"). Both loops are
//! cancellation-aware: they select over their timer and a shutdown signal
//! rather than sleeping unconditionally, so the process entrypoint can
//! stop them promptly during `Stop`.

use crate::store::PersistenceStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Spawns the backup loop (`backup_interval`) and a daily cleanup loop on
/// the store's worker pool. Returns their join handles so the caller can
/// await clean shutdown.
pub fn spawn_background_workers(
    store: Arc<PersistenceStore>,
    backup_interval: Duration,
    cleanup_interval: Duration,
    shutdown: CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>> {
    vec![
        spawn_backup_loop(store.clone(), backup_interval, shutdown.clone()),
        spawn_cleanup_loop(store, cleanup_interval, shutdown),
    ]
}

fn spawn_backup_loop(
    store: Arc<PersistenceStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.backup().await {
                        Ok(manifest) => tracing::info!(
                            files = manifest.file_count,
                            bytes = manifest.total_bytes,
                            "scheduled backup completed"
                        ),
                        Err(error) => tracing::warn!(%error, "scheduled backup failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("persistence backup loop shutting down, running final backup");
                    if let Err(error) = store.backup().await {
                        tracing::warn!(%error, "final backup on shutdown failed");
                    }
                    break;
                }
            }
        }
    })
}

fn spawn_cleanup_loop(
    store: Arc<PersistenceStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.cleanup(None, chrono::Utc::now()).await {
                        Ok(report) => tracing::info!(
                            partitions = report.partitions_removed,
                            bytes_freed = report.bytes_freed,
                            "scheduled cleanup completed"
                        ),
                        Err(error) => tracing::warn!(%error, "scheduled cleanup failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("persistence cleanup loop shutting down");
                    break;
                }
            }
        }
    })
}
