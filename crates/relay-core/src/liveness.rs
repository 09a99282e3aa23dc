//! Liveness sweep.
//!
//! The monitor never probes anyone. It only compares each computer's
//! `last_seen` (refreshed by registration and heartbeats) against the
//! timeout. Driving it periodically is up to the caller.

use std::time::Duration;

use tokio::time::Instant;

use crate::registry::ConnectionRegistry;

#[derive(Debug, Clone, Copy)]
pub struct LivenessMonitor {
    timeout: Duration,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        LivenessMonitor::new(crate::DEFAULT_COMPUTER_TIMEOUT)
    }
}

impl LivenessMonitor {
    pub fn new(timeout: Duration) -> Self {
        LivenessMonitor { timeout }
    }

    /// Evict every computer idle for longer than the timeout.
    ///
    /// Returns the evicted ids, sorted. Client bindings pointing at them
    /// are left untouched.
    pub fn sweep(&self, registry: &mut ConnectionRegistry, now: Instant) -> Vec<String> {
        let stale = registry.stale_ids(now, self.timeout);
        for id in &stale {
            registry.remove(id);
        }
        stale
    }
}
