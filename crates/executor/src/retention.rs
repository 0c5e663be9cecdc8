//! Periodic eviction of finished jobs.
//!
//! Completed and failed jobs are kept for the configured retention period
//! and then dropped together with bundles nothing refers to any more.
//! After eviction a job's status reads `not_found` and its result fetch
//! fails with `NOT_FOUND`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::store::{Evicted, JobStore};

/// One eviction pass using `retention` as the age limit.
pub async fn sweep(store: &JobStore, retention: Duration) -> Evicted {
    let cutoff = chrono::Duration::from_std(retention)
        .ok()
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    store.evict_before(cutoff).await
}

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    store: Arc<JobStore>,
    retention: Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = every.as_secs(),
        "Result retention job started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = sweep(&store, retention).await;
                if evicted.jobs > 0 || evicted.bundles > 0 {
                    tracing::info!(
                        jobs = evicted.jobs,
                        bundles = evicted.bundles,
                        "Result retention: evicted expired entries"
                    );
                } else {
                    tracing::debug!("Result retention: nothing to evict");
                }
            }
        }
    }
}
