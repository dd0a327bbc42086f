//! Opt-in background task that ends rooms whose window has elapsed.
//!
//! Nothing ends a room on its own unless this sweep is running. Each pass
//! goes through [`RoomCoordinator::end_elapsed`], so it takes the same
//! room locks and hits the same `NotYetOver` guard as a manual end.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{LifecycleStore, RoomCoordinator};

/// Handle to a running sweep.
///
/// The sweep runs for as long as this handle lives. [`stop`](Self::stop)
/// ends it and waits for the task; dropping the handle ends it too, after
/// any pass already in progress.
#[derive(Debug)]
pub struct SweepHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stops the sweep and waits for the task to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Starts a sweep that runs every `interval`.
pub fn spawn_expiry_sweep<S: LifecycleStore>(
    coordinator: Arc<RoomCoordinator<S>>,
    interval: Duration,
) -> SweepHandle {
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(?interval, "expiry sweep started");
        loop {
            tokio::select! {
                // A stop request or a dropped handle wins over a due tick.
                biased;
                _ = stopped.changed() => break,
                _ = ticker.tick() => {
                    match coordinator.end_elapsed().await {
                        Ok(ended) if !ended.is_empty() => {
                            tracing::info!(count = ended.len(), "expired rooms ended");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "expiry sweep pass failed"),
                    }
                }
            }
        }
        tracing::info!("expiry sweep stopped");
    });
    SweepHandle { stop, task }
}
