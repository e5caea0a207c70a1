// Background removal of expired sessions

use super::storage::SessionStorage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Periodic sweep over a session store
pub struct SessionSweeper;

impl SessionSweeper {
    /// Start sweeping `storage` every `every`.
    ///
    /// The first sweep runs one full interval after start. The task stops when
    /// the returned handle is stopped or dropped.
    pub fn spawn(storage: Arc<dyn SessionStorage>, every: Duration) -> SweeperHandle {
        let every = every.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        info!("Session sweeper started (interval: {:?})", every);

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    // Fires on an explicit stop and when the handle is dropped.
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let removed = storage.cleanup_expired_sessions().await;
                        debug!("Sweep removed {} expired sessions", removed);
                    }
                }
            }

            debug!("Session sweeper stopped");
        });

        SweeperHandle {
            stop_tx: Some(stop_tx),
            task,
        }
    }
}

/// Owner of a running sweep task
pub struct SweeperHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Ask the sweep to stop without waiting for it
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop the sweep and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.stop();
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
