//! Periodic reaper for terminal `ProcessingRequest`/`ProcessingRecord`s.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::storage::Storage;

/// Runs until `shutdown` is cancelled, sweeping terminal records older than `ttl` every `interval`.
pub async fn run_reaper<S: Storage + 'static>(storage: Arc<S>, ttl: Duration, interval: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("reaper shutting down");
                return;
            }
            _ = ticker.tick() => {
                match storage.cleanup_terminal(ttl).await {
                    Ok(count) if count > 0 => tracing::info!(reaped = count, "cleaned up terminal processing records"),
                    Ok(_) => {}
                    Err(err) => tracing::warn!(%err, "reaper sweep failed"),
                }
            }
        }
    }
}
