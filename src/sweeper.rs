// Background eviction of leases that have gone silent.

use crate::registry::LeaseRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long `stop()` waits for the task to wind down before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Periodic task that evicts leases unseen for longer than the stale
/// timeout. Does nothing else; registry calls never fail, so the task
/// cannot bring the process down.
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    pub fn spawn(registry: Arc<LeaseRegistry>, period: Duration, stale_timeout: Duration) -> Self {
        let (shutdown, mut rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.sweep_stale(stale_timeout);
                        if evicted > 0 {
                            debug!(evicted, "sweep complete");
                        }
                    }
                    _ = rx.changed() => break,
                }
            }
            info!("sweeper stopped");
        });
        Self { shutdown, handle }
    }

    /// Signal the task and wait for it, bounded. Used during process
    /// shutdown.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if tokio::time::timeout(STOP_GRACE, &mut self.handle)
            .await
            .is_err()
        {
            warn!("sweeper did not stop in time, aborting");
            self.handle.abort();
        }
    }
}
