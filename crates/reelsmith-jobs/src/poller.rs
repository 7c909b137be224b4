//! Progress poll tasks.
//!
//! One task per running job. A task only produces [`PollUpdate`]s; the owner
//! of the job state consumes them, so no lock guards domain state. A task
//! ends on its own after forwarding a terminal report, when told to shut
//! down, or when its [`PollHandle`] is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use reelsmith_core::{JobBackend, JobKind, ProgressReport};

/// A relevant progress report for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub kind: JobKind,
    pub run_id: Uuid,
    pub report: ProgressReport,
}

/// Counts poll tasks whose future has not been dropped yet.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner's handle on a poll task. Dropping it aborts the task.
pub struct PollHandle {
    run_id: Uuid,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Spawn a task polling `backend` every `period` on behalf of `run_id`.
    ///
    /// The first fetch happens one period after spawning. Only one request
    /// is in flight at a time; ticks missed while a request is slow are
    /// delayed rather than burst.
    pub fn spawn<B>(
        backend: Arc<B>,
        kind: JobKind,
        run_id: Uuid,
        period: Duration,
        updates: mpsc::UnboundedSender<PollUpdate>,
        live: &Arc<AtomicUsize>,
    ) -> Self
    where
        B: JobBackend + ?Sized + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let guard = LiveGuard::new(live);

        let task = tokio::spawn(async move {
            let _guard = guard;
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    result = backend.progress() => result,
                };

                let report = match result {
                    Ok(report) => report,
                    Err(e) => {
                        warn!(job_kind = %kind, %run_id, error = %e, "Progress poll failed");
                        continue;
                    }
                };

                if !report.status.is_terminal() && !report.status.is_progress_for(kind) {
                    debug!(job_kind = %kind, status = ?report.status, "Ignoring unrelated progress status");
                    continue;
                }

                let terminal = report.status.is_terminal();
                if updates.send(PollUpdate { kind, run_id, report }).is_err() {
                    debug!(job_kind = %kind, %run_id, "Update receiver gone, stopping poller");
                    break;
                }
                if terminal {
                    break;
                }
            }

            debug!(job_kind = %kind, %run_id, "Poller stopped");
        });

        Self {
            run_id,
            shutdown_tx,
            task: Some(task),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the task and wait until it has exited.
    pub async fn cancel(mut self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(run_id = %self.run_id, error = %e, "Poll task panicked");
                }
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
