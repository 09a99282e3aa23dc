//! Periodic liveness sweep driver.
//!
//! The sweep itself runs inside the relay task (it mutates the
//! registry); this task only asks for one every `period`. It holds an
//! explicit stop handle so shutdown can end it cleanly.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::types::{RelayRequest, RelayTx};

/// Stop handle for a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.join.await;
    }
}

/// Spawn a task requesting a sweep every `period`, first one a full
/// period after start.
pub fn spawn_sweeper(relay_tx: RelayTx, period: Duration) -> SweeperHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    if relay_tx.send(RelayRequest::Sweep).is_err() {
                        break;
                    }
                }
            }
        }

        debug!("sweeper stopped");
    });

    SweeperHandle { stop_tx, join }
}
