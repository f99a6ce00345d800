//! Recurring timer that drives the synchronizer.

use super::RateSynchronizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, warn};

/// Longest period the timer accepts; longer requests are clamped.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Owns the background synchronization task. Dropping the handle also stops it.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signals the task to stop and waits for it. A tick in flight is abandoned.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Synchronization task ended abnormally");
        }
        info!("Rate synchronization stopped");
    }
}

impl RateSynchronizer {
    /// Starts ticking every `period`, the first tick one period from now.
    ///
    /// A tick that is still running when the next one is due makes the timer
    /// skip: at most one overdue tick fires once it finishes, the rest are
    /// dropped rather than queued.
    pub fn spawn(self: Arc<Self>, period: Duration) -> SyncHandle {
        let period = period.clamp(Duration::from_millis(1), MAX_PERIOD);
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(?period, "Rate synchronization started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.changed() => break,
                }

                tokio::select! {
                    result = self.sync_once() => {
                        if let Err(e) = result {
                            error!(error = %e, "Failed to read rates for synchronization");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
        });

        SyncHandle { shutdown, task }
    }
}
