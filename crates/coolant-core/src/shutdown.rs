// ── Shutdown coordination ──
//
// Counts in-flight critical operations (store writes) so a shutdown
// routine can wait for them to finish. The count lives in a `watch`
// channel: every change goes through the channel's lock, and waiters are
// woken on change instead of polling.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shared in-flight counter. Cheap to clone; clones share one count.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    count: Arc<watch::Sender<usize>>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// The process-wide coordinator used by writers that are not given one.
    pub fn global() -> &'static ShutdownCoordinator {
        static GLOBAL: OnceLock<ShutdownCoordinator> = OnceLock::new();
        GLOBAL.get_or_init(ShutdownCoordinator::new)
    }

    /// Mark a critical operation as started. It ends when the guard drops,
    /// on every exit path including errors and unwinding.
    pub fn enter(&self) -> CriticalGuard {
        self.count.send_modify(|n| *n += 1);
        debug!(in_flight = self.in_flight(), "critical operation entered");
        CriticalGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until no critical operation is in flight.
    ///
    /// Returns `true` once drained, or `false` if `timeout` expired first.
    /// Never cancels the operations themselves.
    pub async fn wait_for_drain(&self, timeout: Option<Duration>) -> bool {
        let mut rx = self.count.subscribe();
        let in_flight = *rx.borrow();
        if in_flight == 0 {
            debug!("no critical operations in flight");
            return true;
        }
        info!(in_flight, ?timeout, "waiting for critical operations to finish");

        let drained = async { rx.wait_for(|n| *n == 0).await.is_ok() };
        let finished = match timeout {
            Some(limit) => tokio::time::timeout(limit, drained).await.unwrap_or(false),
            None => drained.await,
        };

        if finished {
            info!("all critical operations finished");
        } else {
            warn!(
                in_flight = self.in_flight(),
                "timed out waiting for critical operations"
            );
        }
        finished
    }
}

/// Scope of one critical operation. Decrements the count on drop.
#[derive(Debug)]
#[must_use = "the operation counts as finished as soon as the guard is dropped"]
pub struct CriticalGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for CriticalGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
        debug!(in_flight = *self.count.borrow(), "critical operation exited");
    }
}
