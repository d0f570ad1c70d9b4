//! Periodic cleanup of expired availability cache rows.
//!
//! Expiry is lazy (readers filter on `expires_at`), so this sweep is
//! pure housekeeping: it keeps the table from accumulating dead rows.
//! Runs on a fixed interval using `tokio::time::interval`.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use provnet_db::repositories::AvailabilityCacheRepo;

/// Run the cache sweep loop.
///
/// Deletes rows past their `expires_at` every `interval`. Runs until
/// `cancel` is triggered.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Availability cache sweep started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Availability cache sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match AvailabilityCacheRepo::delete_expired(&pool).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Cache sweep: purged expired rows");
                        } else {
                            tracing::debug!("Cache sweep: no rows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Cache sweep failed");
                    }
                }
            }
        }
    }
}
