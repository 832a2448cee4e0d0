//! Periodic tick registration as a scoped resource.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ModuleShared;

/// Handle to a running tick task.
///
/// [`Ticker::stop`] consumes the handle, so a registration is cancelled
/// exactly once and double-cancellation is unrepresentable. Dropping the
/// handle closes the shutdown channel instead and the task exits on its next
/// wakeup. Stopping never aborts an in-flight tick; the current cycle
/// finishes before the task returns.
pub struct Ticker {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
    interval_ms: u64,
}

impl Ticker {
    /// Spawn the tick loop. The first tick fires immediately, then every
    /// `interval_ms`; missed ticks are skipped, never queued.
    pub(crate) fn spawn(shared: Arc<ModuleShared>, interval_ms: u64) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => shared.tick().await,
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("tick task for '{}' stopped", shared.name);
        });
        Self {
            shutdown,
            handle,
            interval_ms,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Stop the tick loop and wait for the task to finish its current cycle.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
