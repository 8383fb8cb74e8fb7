use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use driver_routes::{PathSelections, Schedule, Waypoint};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use tracker_core::{DocumentStore, Error, Mailbox, PositionDocument, Result};
use uuid::Uuid;

/// Outcome of a completed delivery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,

    /// Whether each driver follows its optimal path in this run.
    pub selections: PathSelections,
}

/// Replays schedules into a [`DocumentStore`].
///
/// Runs are serialized: a second call to [`Orchestrator::run_delivery`] waits
/// until the first has written its last waypoint.
#[derive(Debug)]
pub struct Orchestrator<S> {
    store: Arc<S>,
    pacing: Duration,
    completed: AtomicBool,
    run_lock: Mutex<()>,
    producer: Mailbox<Waypoint>,
}

impl<S: DocumentStore> Orchestrator<S> {
    /// `pacing` is the pause after every write. Zero yields to the runtime
    /// without sleeping.
    #[must_use]
    pub fn new(store: Arc<S>, pacing: Duration) -> Self {
        Self {
            store,
            pacing,
            completed: AtomicBool::new(false),
            run_lock: Mutex::new(()),
            producer: Mailbox::new(),
        }
    }

    /// Write every waypoint of `schedule` to the store in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when a write fails. The run stops at the failed
    /// waypoint and is not marked complete.
    pub async fn run_delivery(&self, schedule: &Schedule) -> Result<RunResult> {
        let _run = self.run_lock.lock().await;

        let run_id = Uuid::new_v4();
        self.completed.store(false, Ordering::SeqCst);
        info!(run_id = %run_id, waypoints = schedule.len(), "delivery run started");

        for (seq, waypoint) in schedule.waypoints().iter().enumerate() {
            let document = PositionDocument {
                driver_name: waypoint.name.clone(),
                lat: waypoint.lat,
                lng: waypoint.lng,
                optimal: waypoint.optimal,
            };

            let outcome = match self.store.upsert(&document).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(
                        monotonic_counter.store_errors = 1,
                        run_id = %run_id,
                        seq,
                        driver = %waypoint.name,
                        error = %e
                    );
                    return Err(Error::Store(format!(
                        "writing waypoint {seq} for {}: {e}",
                        waypoint.name
                    )));
                }
            };

            if outcome.modified {
                self.producer.push(waypoint.clone()).await;
            }
            debug!(
                monotonic_counter.waypoints_written = 1,
                run_id = %run_id,
                seq,
                driver = %waypoint.name,
                modified = outcome.modified
            );

            if self.pacing.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.pacing).await;
            }
        }

        self.completed.store(true, Ordering::SeqCst);
        info!(run_id = %run_id, "delivery run completed");

        Ok(RunResult { run_id, selections: schedule.selections().clone() })
    }

    /// Clear the completion flag, returning its previous value.
    ///
    /// Readers use this to reset trip state exactly once per finished run.
    pub fn take_completed(&self) -> bool {
        self.completed.swap(false, Ordering::SeqCst)
    }

    /// Pop the oldest waypoint that modified the store.
    pub async fn pop_producer(&self) -> Option<Waypoint> {
        self.producer.pop().await
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}
